pub mod config_io;
pub mod feed;
pub mod logging;
pub mod signals;
pub mod state;
