pub mod config;
pub mod error;
pub mod format;
pub mod route;
pub mod state;
