pub mod column;
pub mod comment;
pub mod config;
pub mod label;
pub mod notice;
pub mod project;
pub mod task;

pub use column::*;
pub use comment::*;
pub use config::*;
pub use label::*;
pub use notice::*;
pub use project::*;
pub use task::*;
