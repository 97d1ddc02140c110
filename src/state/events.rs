//! Table events published to the application

/// Events observers of a table can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// Current item changed (`None` when there is no current item)
    CurrentIndexChanged(Option<usize>),

    /// The set of selected rows changed
    SelectedIndexesChanged(Vec<usize>),

    /// An item was activated by double click or Enter
    ItemActivated(usize),

    /// A column header was clicked (logical column index)
    ColumnClicked(usize),

    /// Header drag reordering was enabled/disabled
    ColumnsOrderableChanged(bool),

    /// Header resizing was enabled/disabled
    ColumnsSizableChanged(bool),
}

impl TableEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            TableEvent::CurrentIndexChanged(_) => "current_index_changed",
            TableEvent::SelectedIndexesChanged(_) => "selected_indexes_changed",
            TableEvent::ItemActivated(_) => "item_activated",
            TableEvent::ColumnClicked(_) => "column_clicked",
            TableEvent::ColumnsOrderableChanged(_) => "columns_orderable_changed",
            TableEvent::ColumnsSizableChanged(_) => "columns_sizable_changed",
        }
    }
}
