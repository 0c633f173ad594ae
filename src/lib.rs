pub mod cli;
pub mod commands;
pub mod config;
pub mod templates;

pub use cli::{Cli, Commands};
pub use config::{read_config, ConfigOverrides, DEFAULT_CONFIG_FILE};
