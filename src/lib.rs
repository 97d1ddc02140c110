pub mod column_manager;
pub mod config;
pub mod data;
pub mod debouncer;
pub mod error;
pub mod state;
pub mod ui;
pub mod utils;

pub use column_manager::{Column, ColumnRegistry};
pub use data::table_model::{ModelEvent, SortOrder, TableModel};
pub use error::{NativeError, TableError};
pub use state::events::TableEvent;
pub use ui::pane::{NativePane, Pane};
pub use ui::table_view::{Key, PaneEvent, TableView};
