pub mod app;
pub mod board;
pub mod form;
pub mod input;
pub mod keymap;
pub mod mode;
pub mod notice;
pub mod picker;
pub mod render;
pub mod selection;
pub mod sync;
pub mod theme;

pub use app::{LaunchOptions, run};
