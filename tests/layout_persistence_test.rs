use ratatui::layout::Rect;
use tempfile::TempDir;

use frozen_table::data::memory_model::MemoryTableModel;
use frozen_table::data::value::CellValue;
use frozen_table::state::layout::{ColumnState, PersistedLayout};
use frozen_table::ui::terminal_pane::TerminalPane;
use frozen_table::utils::settings_store::{FileSettings, MemorySettings, SettingsStore};
use frozen_table::{Column, ColumnRegistry, NativePane, Pane, SortOrder, TableError, TableView};

fn columns() -> ColumnRegistry {
    ColumnRegistry::with_columns([
        Column::new("id").with_frozen(true).with_width(5),
        Column::new("symbol").with_frozen(true).with_width(8),
        Column::new("qty").with_width(6),
        Column::new("price").with_width(9),
        Column::new("venue").with_width(10),
    ])
    .unwrap()
}

fn model() -> MemoryTableModel {
    let mut model = MemoryTableModel::new(
        ["id", "symbol", "qty", "price", "venue"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    for (id, symbol, qty) in [(1, "MSFT", 30), (2, "AAPL", 10), (3, "IBM", 20)] {
        model.push_row(vec![
            CellValue::Integer(id),
            CellValue::Text(symbol.into()),
            CellValue::Integer(qty),
            CellValue::Float(qty as f64 * 1.5),
            CellValue::Text("XNYS".into()),
        ]);
    }
    model
}

fn view(columns: ColumnRegistry) -> TableView<TerminalPane> {
    let mut view = TableView::new(TerminalPane::new(), TerminalPane::new());
    view.set_columns(columns).unwrap();
    view.set_bounds(Rect::new(0, 0, 60, 10));
    view.set_model(Some(Box::new(model()))).unwrap();
    view
}

fn display_names(view: &TableView<TerminalPane>) -> Vec<String> {
    view.visible_columns_in_display_order()
        .unwrap()
        .into_iter()
        .map(|c| c.name().to_string())
        .collect()
}

#[test]
fn test_save_then_restore_reproduces_layout() {
    let mut original = view(columns());
    original.panes_mut().frozen.set_column_order(&[1, 0]).unwrap();
    original.panes_mut().normal.set_column_order(&[2, 0, 1]).unwrap();
    original.set_column_width(3, 14).unwrap();
    original.set_column_visible(4, false).unwrap();
    original.set_column_title_override(2, "Quantity").unwrap();
    original.sort_by(2, SortOrder::Descending).unwrap();

    let mut store = MemorySettings::new();
    original.save_state(&mut store, "trades").unwrap();
    let saved = original.save_layout().unwrap().unwrap();
    assert_eq!(saved.display_order, vec!["symbol", "id", "qty", "price"]);
    assert_eq!(saved.sort_column_name, "qty");

    let mut restored = view(columns());
    restored.restore_state(&store, "trades").unwrap();

    assert_eq!(display_names(&restored), display_names(&original));
    assert_eq!(restored.save_layout().unwrap(), Some(saved));
    assert_eq!((restored.sorted_column(), restored.sort_order()), (2, SortOrder::Descending));
    assert_eq!(restored.columns().get(2).unwrap().display_title(), "Quantity");
    assert!(!restored.columns().get(4).unwrap().visible());
    assert_eq!(restored.cell_text(Pane::Frozen, 0, 0), "1");
    assert_eq!(restored.panes().normal.sort_indicator(), Some((0, SortOrder::Descending)));
}

#[test]
fn test_unknown_names_ignored_and_new_columns_appended() {
    let state = PersistedLayout {
        sort_column_name: "price".into(),
        sort_order: SortOrder::Ascending,
        display_order: vec!["price".into(), "retired".into(), "id".into(), "qty".into()],
        columns: vec![
            ColumnState { name: "id".into(), title: String::new(), width: 5, frozen: true },
            ColumnState { name: "qty".into(), title: String::new(), width: 6, frozen: false },
            ColumnState { name: "price".into(), title: String::new(), width: 9, frozen: false },
            ColumnState { name: "retired".into(), title: "Old".into(), width: 3, frozen: true },
        ],
    };

    // "symbol" is persisted nowhere, "venue" is new since the save
    let mut view = view(columns());
    view.restore_layout(&state).unwrap();

    assert_eq!(display_names(&view), vec!["id", "symbol", "price", "qty", "venue"]);
    assert_eq!((view.sorted_column(), view.sort_order()), (3, SortOrder::Ascending));
}

#[test]
fn test_listed_columns_missing_from_display_order_are_hidden() {
    let mut view = view(columns());
    let mut state = view.save_layout().unwrap().unwrap();
    state.display_order.retain(|name| name != "price");

    view.restore_layout(&state).unwrap();
    assert!(!view.columns().get(3).unwrap().visible());
    assert_eq!(display_names(&view), vec!["id", "symbol", "qty", "venue"]);
}

fn model_sortable_from_qty() -> MemoryTableModel {
    let mut m = model();
    m.set_column_sortable(0, false);
    m.set_column_sortable(1, false);
    m
}

#[test]
fn test_unsortable_sort_column_falls_back() {
    let mut view = TableView::new(TerminalPane::new(), TerminalPane::new());
    view.set_columns(columns()).unwrap();
    // sorting by column 0 on attach fails, and nothing is attached
    assert!(matches!(
        view.set_model(Some(Box::new(model_sortable_from_qty()))),
        Err(TableError::Model(_))
    ));
    assert!(view.model().is_none());

    let mut state = view.save_layout().unwrap().unwrap();
    state.sort_column_name = "price".into();
    view.restore_layout(&state).unwrap();
    assert_eq!(view.sorted_column(), 3);
    view.set_model(Some(Box::new(model_sortable_from_qty()))).unwrap();

    state.sort_column_name = "symbol".into();
    view.restore_layout(&state).unwrap();

    assert_eq!(view.sorted_column(), 2);
    assert_eq!(view.cell_text(Pane::Normal, 0, 0), "10");
}

#[test]
fn test_empty_or_missing_state_is_noop() {
    let mut store = MemorySettings::new();
    let mut view = view(columns());
    let before = view.save_layout().unwrap();

    view.restore_state(&store, "nothing").unwrap();
    store.write_state("blank", "  ").unwrap();
    view.restore_state(&store, "blank").unwrap();
    assert_eq!(view.save_layout().unwrap(), before);
}

#[test]
fn test_malformed_state_is_an_error() {
    let mut store = MemorySettings::new();
    store.write_state("broken", "{\"displayOrder\": 7").unwrap();

    let mut view = view(columns());
    assert!(matches!(
        view.restore_state(&store, "broken"),
        Err(TableError::Layout(_))
    ));
    assert!(view.panes().normal.redraw_enabled());
}

#[test]
fn test_saving_without_columns_writes_nothing() {
    let mut store = MemorySettings::new();
    let view: TableView<TerminalPane> = TableView::new(TerminalPane::new(), TerminalPane::new());
    view.save_state(&mut store, "empty").unwrap();
    assert_eq!(store.read_state("empty").unwrap(), None);
}

#[test]
fn test_file_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut store = FileSettings::new(dir.path().join("layouts"));

    let mut original = view(columns());
    original.set_column_frozen(2, true).unwrap();
    original.save_state(&mut store, "blotter/main").unwrap();

    let written: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
    assert_eq!(written.len(), 1);

    let reopened = FileSettings::new(dir.path().join("layouts"));
    let mut restored = view(columns());
    restored.restore_state(&reopened, "blotter/main").unwrap();

    assert!(restored.columns().get(2).unwrap().frozen());
    assert_eq!(restored.columns().frozen_visible_count(), 3);
    assert_eq!(display_names(&restored), display_names(&original));
}
