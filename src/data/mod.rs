//! Data layer
//!
//! Model traits, typed cell values, display formatting and the bridge that
//! answers the panes' per-cell queries.

pub mod cell_format;
pub mod data_bridge;
pub mod memory_model;
pub mod table_model;
pub mod value;
