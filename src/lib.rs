pub mod app;
pub mod cli;
pub mod config;
pub mod films;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
