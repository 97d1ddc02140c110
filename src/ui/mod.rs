//! User interface layer
//!
//! The two native panes, the synchronizer that makes them scroll and focus
//! as one, and the TableView that owns them.

pub mod pane;
pub mod pane_sync;
pub mod reentrancy;
pub mod table_renderer;
pub mod table_view;
pub mod terminal_pane;
