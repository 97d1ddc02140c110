//! Utility helpers
//!
//! Paths, logging and settings storage used by the table and the demo.

pub mod app_paths;
pub mod logging;
pub mod settings_store;
