//! Configuration module
//!
//! Table appearance and behavior settings read from `config.toml`.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::{parse_color, BehaviorConfig, DisplayConfig, TableConfig, TableOptions};
