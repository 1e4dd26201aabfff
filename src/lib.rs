pub mod app;
pub mod config;
pub mod database;
pub mod play;
pub mod traits;
pub mod util;
