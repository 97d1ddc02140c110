//! TableView: one logical table drawn by a frozen and a normal pane
//!
//! The view owns the column registry, the data bridge, both panes and the
//! selection controller. Native input arrives through
//! [`TableView::handle_pane_event`]; model changes through
//! [`TableView::on_model_event`]. Application-visible changes are published
//! as [`TableEvent`]s.

use ratatui::layout::Rect;
use ratatui::style::Color;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::column_manager::{Column, ColumnRegistry};
use crate::config::TableOptions;
use crate::data::data_bridge::DataBridge;
use crate::data::table_model::{CellStyle, CellStyler, ItemChecker, ModelEvent, SortOrder, TableModel};
use crate::error::{NativeError, Result};
use crate::state::dispatcher::{EventDispatcher, TableEventSubscriber};
use crate::state::events::TableEvent;
use crate::state::layout::{self, PersistedLayout};
use crate::state::selection::SelectionController;
use crate::ui::pane::{HitTest, ItemState, ItemTarget, NativePane, Pane, PanePair, PaneStyle};
use crate::ui::pane_sync::PaneSynchronizer;
use crate::utils::settings_store::SettingsStore;

/// Columns scrolled per horizontal key press
const HORIZONTAL_STEP: i32 = 4;

/// Keys the panes handle themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Left,
    Right,
    Space,
    Enter,
}

/// Raw input and notifications from one native pane.
/// Coordinates are relative to the pane's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneEvent {
    /// The pane is about to repaint its background
    EraseBackground,
    ButtonDown {
        x: u16,
        y: u16,
        double: bool,
        right: bool,
        /// Ctrl-click: toggle the row in a multi-selection
        extend: bool,
    },
    MouseMove {
        x: u16,
        y: u16,
    },
    MouseLeave,
    MouseWheel {
        delta_rows: i32,
    },
    KeyDown(Key),
    SetFocus,
    KillFocus,
    /// The pane scrolled itself vertically
    Scrolled {
        dy_rows: i32,
    },
    /// Header click by visual index
    ColumnClick(usize),
    ColumnResized {
        visual: usize,
        width: u16,
    },
    /// The state of `row` (`None`: every row) changed natively
    ItemChanged {
        row: Option<usize>,
        selected_before: bool,
        selected_now: bool,
    },
    /// A range of rows changed state at once
    OdStateChanged,
    ItemActivate(usize),
    /// Rows `from..=to` are about to be painted
    CacheHint {
        from: usize,
        to: usize,
    },
}

pub struct TableView<P: NativePane> {
    columns: ColumnRegistry,
    bridge: DataBridge,
    panes: PanePair<P>,
    sync: PaneSynchronizer,
    selection: SelectionController,
    events: EventDispatcher,
    sorted_column: usize,
    sort_order: SortOrder,
    check_boxes: bool,
    persistent: bool,
    suspend_depth: usize,
}

impl<P: NativePane> TableView<P> {
    pub fn new(frozen: P, normal: P) -> Self {
        Self {
            columns: ColumnRegistry::new(),
            bridge: DataBridge::new(),
            panes: PanePair::new(frozen, normal),
            sync: PaneSynchronizer::new(),
            selection: SelectionController::new(0),
            events: EventDispatcher::new(),
            sorted_column: 0,
            sort_order: SortOrder::Ascending,
            check_boxes: false,
            persistent: false,
            suspend_depth: 0,
        }
    }

    pub fn with_options(frozen: P, normal: P, options: &TableOptions) -> Result<Self> {
        let mut view = Self::new(frozen, normal);
        view.set_header_hidden(options.header_hidden)?;
        view.set_alternating_row_color(options.alternating_row_color);
        view.set_check_glyph(options.check_glyph.as_str());
        view.set_check_boxes(options.check_boxes)?;
        view.set_multi_selection(options.multi_selection)?;
        view.set_item_state_changed_delay(options.item_state_changed_delay_ms);
        view.set_columns_orderable(options.columns_orderable)?;
        view.set_columns_sizable(options.columns_sizable)?;
        view.set_sortable_by_header_click(options.sortable_by_header_click)?;
        view.set_last_column_stretched(options.last_column_stretched)?;
        view.set_persistent(options.persistent);
        Ok(view)
    }

    // ---- collaborators -------------------------------------------------

    pub fn panes(&self) -> &PanePair<P> {
        &self.panes
    }

    pub fn panes_mut(&mut self) -> &mut PanePair<P> {
        &mut self.panes
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn TableEventSubscriber>) {
        self.events.subscribe(subscriber);
    }

    pub fn event_history(&self) -> &[TableEvent] {
        self.events.event_history()
    }

    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        self.events.drain_history()
    }

    /// Suspend pane redraw for the duration of `f`, resuming on every exit path
    fn suspended<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.suspend_depth == 0 {
            self.panes.each(|p| p.set_redraw(false));
        }
        self.suspend_depth += 1;

        let result = f(self);

        self.suspend_depth -= 1;
        if self.suspend_depth == 0 {
            self.panes.each(|p| p.set_redraw(true));
        }
        result
    }

    pub fn invalidate(&mut self) {
        self.panes.each(|p| p.invalidate());
    }

    // ---- options ---------------------------------------------------------

    fn set_pane_style(&mut self, style: PaneStyle, enabled: bool) -> Result<()> {
        self.panes.try_each(|p| p.set_style(style, enabled))?;
        Ok(())
    }

    pub fn columns_orderable(&self) -> bool {
        self.panes.normal.style(PaneStyle::ColumnsOrderable)
    }

    pub fn set_columns_orderable(&mut self, enabled: bool) -> Result<()> {
        self.set_pane_style(PaneStyle::ColumnsOrderable, enabled)?;
        self.events.publish(TableEvent::ColumnsOrderableChanged(enabled));
        Ok(())
    }

    pub fn columns_sizable(&self) -> bool {
        self.panes.normal.style(PaneStyle::ColumnsSizable)
    }

    pub fn set_columns_sizable(&mut self, enabled: bool) -> Result<()> {
        self.set_pane_style(PaneStyle::ColumnsSizable, enabled)?;
        self.events.publish(TableEvent::ColumnsSizableChanged(enabled));
        Ok(())
    }

    pub fn header_hidden(&self) -> bool {
        self.panes.normal.style(PaneStyle::HeaderHidden)
    }

    pub fn set_header_hidden(&mut self, hidden: bool) -> Result<()> {
        self.set_pane_style(PaneStyle::HeaderHidden, hidden)
    }

    pub fn sortable_by_header_click(&self) -> bool {
        self.panes.frozen.style(PaneStyle::SortableHeader)
            || self.panes.normal.style(PaneStyle::SortableHeader)
    }

    pub fn set_sortable_by_header_click(&mut self, sortable: bool) -> Result<()> {
        self.set_pane_style(PaneStyle::SortableHeader, sortable)
    }

    pub fn alternating_row_color(&self) -> Option<Color> {
        self.bridge.alternating_row_color()
    }

    pub fn set_alternating_row_color(&mut self, color: Option<Color>) {
        self.bridge.set_alternating_row_color(color);
        self.invalidate();
    }

    pub fn set_check_glyph(&mut self, glyph: &str) {
        self.bridge.set_check_glyph(glyph);
    }

    /// The pane drawing check boxes and row images: the one with the first
    /// visible column
    pub fn check_box_pane(&self) -> Pane {
        if self.columns.has_frozen_column() {
            Pane::Frozen
        } else {
            Pane::Normal
        }
    }

    pub fn check_boxes(&self) -> bool {
        self.check_boxes
    }

    pub fn set_check_boxes(&mut self, enabled: bool) -> Result<()> {
        self.check_boxes = enabled;
        self.apply_check_boxes()
    }

    fn apply_check_boxes(&mut self) -> Result<()> {
        let host = self.check_box_pane();
        self.panes
            .get_mut(host)
            .set_style(PaneStyle::CheckBoxes, self.check_boxes)?;
        self.panes
            .get_mut(host.other())
            .set_style(PaneStyle::CheckBoxes, false)?;
        Ok(())
    }

    pub fn multi_selection(&self) -> bool {
        self.selection.multi_selection()
    }

    pub fn set_multi_selection(&mut self, multi: bool) -> Result<()> {
        self.set_pane_style(PaneStyle::MultiSelection, multi)?;
        self.selection
            .set_multi_selection(&mut self.events, multi, Instant::now());
        Ok(())
    }

    pub fn last_column_stretched(&self) -> bool {
        self.sync.last_column_stretched()
    }

    pub fn set_last_column_stretched(&mut self, stretched: bool) -> Result<()> {
        if stretched {
            self.stretch_last_column()?;
        }
        self.sync.set_last_column_stretched(stretched);
        Ok(())
    }

    /// Make the last column take up the remaining width once
    pub fn stretch_last_column(&mut self) -> Result<()> {
        self.sync
            .stretch_last_column(&mut self.columns, &mut self.panes)?;
        Ok(())
    }

    /// Notification delay in milliseconds
    pub fn item_state_changed_delay(&self) -> u64 {
        self.selection.item_state_changed_delay()
    }

    pub fn set_item_state_changed_delay(&mut self, delay_ms: u64) {
        self.selection.set_item_state_changed_delay(delay_ms);
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    pub fn set_cell_styler(&mut self, styler: Option<Box<dyn CellStyler>>) {
        self.bridge.set_cell_styler(styler);
        self.invalidate();
    }

    pub fn set_item_checker(&mut self, checker: Option<Box<dyn ItemChecker>>) {
        self.bridge.set_item_checker(checker);
        self.invalidate();
    }

    // ---- geometry ------------------------------------------------------

    /// Place both panes inside `client`
    pub fn set_bounds(&mut self, client: Rect) {
        self.sync.layout(&self.columns, &mut self.panes, client);
    }

    pub fn bounds(&self) -> Rect {
        self.sync.client_bounds()
    }

    /// Fully visible rows of the normal pane
    pub fn rows_per_page(&self) -> usize {
        self.panes.normal.rows_per_page()
    }

    pub fn item_count(&self) -> usize {
        self.panes.normal.item_count()
    }

    // ---- columns -------------------------------------------------------

    /// Replace all columns; pane order arrays start out in logical order
    pub fn set_columns(&mut self, columns: ColumnRegistry) -> Result<()> {
        self.columns = columns;
        self.sync.sync_columns(&self.columns, &mut self.panes)?;
        self.apply_check_boxes()?;
        self.sync.relayout(&self.columns, &mut self.panes);
        self.refresh_sort_icon()?;
        self.invalidate();
        Ok(())
    }

    /// Apply a structural column change, keeping each pane's display order
    /// for the columns that survive it
    fn restructure_columns<R>(
        &mut self,
        change: impl FnOnce(&mut ColumnRegistry) -> Result<R>,
    ) -> Result<R> {
        let before: Vec<String> = layout::display_order(&self.columns, &self.panes)?
            .into_iter()
            .filter_map(|i| self.columns.get(i).map(|c| c.name().to_string()))
            .collect();

        let result = change(&mut self.columns)?;

        let display: Vec<usize> = before
            .iter()
            .filter_map(|name| self.columns.index_of(name))
            .collect();
        self.sync.sync_columns(&self.columns, &mut self.panes)?;
        layout::apply_display_order(&self.columns, &mut self.panes, &display)?;
        self.apply_check_boxes()?;
        self.sync.relayout(&self.columns, &mut self.panes);
        self.refresh_sort_icon()?;
        self.invalidate();
        Ok(result)
    }

    pub fn add_column(&mut self, column: Column) -> Result<usize> {
        self.restructure_columns(|columns| columns.add(column))
    }

    pub fn remove_column(&mut self, index: usize) -> Result<Column> {
        if index < self.sorted_column {
            self.sorted_column -= 1;
        } else if index == self.sorted_column {
            self.sorted_column = 0;
        }
        self.restructure_columns(|columns| columns.remove(index))
    }

    pub fn set_column_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.restructure_columns(|columns| columns.set_visible(index, visible))
    }

    pub fn set_column_frozen(&mut self, index: usize, frozen: bool) -> Result<()> {
        self.restructure_columns(|columns| columns.set_frozen(index, frozen))
    }

    pub fn set_column_width(&mut self, index: usize, width: u16) -> Result<()> {
        self.columns.set_width(index, width)?;
        self.sync.sync_columns(&self.columns, &mut self.panes)?;
        self.sync.relayout(&self.columns, &mut self.panes);
        Ok(())
    }

    pub fn set_column_title_override(&mut self, index: usize, title: &str) -> Result<()> {
        self.columns.set_title_override(index, title)?;
        self.invalidate();
        Ok(())
    }

    /// Frozen-pane columns in that pane's order, then normal-pane columns
    pub fn visible_columns_in_display_order(&self) -> Result<Vec<&Column>> {
        Ok(layout::display_order(&self.columns, &self.panes)?
            .into_iter()
            .filter_map(|i| self.columns.get(i))
            .collect())
    }

    /// The column shown at `visual` in `pane`
    pub fn pane_column(&self, pane: Pane, visual: usize) -> Option<(usize, &Column)> {
        let logical = self.columns.to_logical_index(pane, visual)?;
        self.columns.get(logical).map(|c| (logical, c))
    }

    // ---- model ---------------------------------------------------------

    pub fn model(&self) -> Option<&dyn TableModel> {
        self.bridge.model()
    }

    pub fn model_mut(&mut self) -> Option<&mut (dyn TableModel + 'static)> {
        self.bridge.model_mut()
    }

    /// Attach a model (or detach with `None`).
    ///
    /// The current item is cleared. A self-sorting model is sorted by the
    /// view's sort column and order before it is attached; if that sort
    /// fails the error is returned and the previous model stays in place.
    pub fn set_model(&mut self, mut model: Option<Box<dyn TableModel>>) -> Result<()> {
        if let Some(sorter) = model.as_mut().and_then(|m| m.as_sorter_mut()) {
            sorter.sort(self.sorted_column, self.sort_order)?;
        }

        self.suspended(|view| {
            view.bridge.set_model(model);
            view.selection.reset_timers();
            view.selection
                .set_current_index(&mut view.panes, &mut view.events, None, Instant::now())?;
            view.set_item_count()?;
            view.refresh_sort_icon()?;
            view.invalidate();

            info!(target: "table_view", "model attached: {} rows", view.bridge.row_count());
            Ok(())
        })
    }

    fn set_item_count(&mut self) -> Result<()> {
        let count = self.bridge.row_count();
        self.panes.try_each(|p| p.set_item_count(count))?;
        Ok(())
    }

    /// Forward a change notification raised by the model
    pub fn on_model_event(&mut self, event: ModelEvent) -> Result<()> {
        self.on_model_event_at(event, Instant::now())
    }

    pub fn on_model_event_at(&mut self, event: ModelEvent, now: Instant) -> Result<()> {
        debug!(target: "table_view", "model event {:?}", event);
        match event {
            ModelEvent::RowsReset => {
                self.set_item_count()?;
                self.selection
                    .on_rows_reset(&mut self.panes, &mut self.events, now)?;
                self.invalidate();
            }
            ModelEvent::RowChanged(row) => self.update_item(row)?,
            ModelEvent::RowsInserted { from, to } => {
                self.set_item_count()?;
                self.selection
                    .on_rows_inserted(&mut self.panes, &mut self.events, from, to, now)?;
                self.invalidate();
            }
            ModelEvent::RowsRemoved { from, to } => {
                self.set_item_count()?;
                self.selection
                    .on_rows_removed(&mut self.panes, &mut self.events, from, to, now)?;
                self.invalidate();
            }
            ModelEvent::SortChanged => {
                if let Some((col, order)) = self.bridge.model_sort() {
                    self.sorted_column = col;
                    self.sort_order = order;
                }
                self.refresh_sort_icon()?;
                self.invalidate();
            }
        }
        Ok(())
    }

    /// Redraw one row; a self-sorting model is re-sorted first
    pub fn update_item(&mut self, row: usize) -> Result<()> {
        if let Some((col, order)) = self.bridge.model_sort() {
            self.bridge.sort(col, order)?;
            self.invalidate();
            return Ok(());
        }
        self.panes.try_each(|p| p.redraw_row(row))?;
        Ok(())
    }

    /// Flip a row's check box through the item checker
    pub fn toggle_item_checked(&mut self, row: usize) -> Result<()> {
        let checked = self.bridge.toggle_checked(row)?;
        trace!(target: "table_view", "row {} checked={}", row, checked);
        self.panes.try_each(|p| p.redraw_row(row))?;
        Ok(())
    }

    // ---- sorting -------------------------------------------------------

    pub fn sorted_column(&self) -> usize {
        self.sorted_column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Sort by a logical column. A failing sort leaves the sort state as it was.
    pub fn sort_by(&mut self, col: usize, order: SortOrder) -> Result<()> {
        if self.columns.get(col).is_none() {
            return Err(crate::error::TableError::ColumnIndex(col));
        }
        self.bridge.sort(col, order)?;
        self.sorted_column = col;
        self.sort_order = order;
        self.refresh_sort_icon()?;
        self.invalidate();
        Ok(())
    }

    /// Show the sort indicator on `col`'s header, clearing all others
    fn set_sort_icon(&mut self, col: usize, order: SortOrder) -> std::result::Result<(), NativeError> {
        let placement = self
            .columns
            .get(col)
            .map(|c| c.pane())
            .zip(self.columns.to_visual_index(col));

        for pane in [Pane::Frozen, Pane::Normal] {
            let indicator = match placement {
                Some((p, visual)) if p == pane => Some((visual, order)),
                _ => None,
            };
            self.panes.get_mut(pane).set_sort_indicator(indicator)?;
        }
        Ok(())
    }

    fn refresh_sort_icon(&mut self) -> std::result::Result<(), NativeError> {
        if self.bridge.is_sortable() {
            self.set_sort_icon(self.sorted_column, self.sort_order)
        } else {
            self.panes.try_each(|p| p.set_sort_indicator(None))
        }
    }

    // ---- current item and selection --------------------------------------

    pub fn current_index(&self) -> Option<usize> {
        self.selection.current_index()
    }

    pub fn set_current_index(&mut self, index: Option<usize>) -> Result<()> {
        self.set_current_index_at(index, Instant::now())
    }

    pub fn set_current_index_at(&mut self, index: Option<usize>, now: Instant) -> Result<()> {
        self.selection
            .set_current_index(&mut self.panes, &mut self.events, index, now)?;
        Ok(())
    }

    pub fn selected_indexes(&self) -> &[usize] {
        self.selection.selected_indexes()
    }

    pub fn set_selected_indexes(&mut self, indexes: &[usize]) -> Result<()> {
        self.set_selected_indexes_at(indexes, Instant::now())
    }

    pub fn set_selected_indexes_at(&mut self, indexes: &[usize], now: Instant) -> Result<()> {
        self.selection
            .set_selected_indexes(&mut self.panes, &mut self.events, indexes, now)?;
        Ok(())
    }

    /// Publish debounced notifications that are due
    pub fn on_timer(&mut self, now: Instant) {
        self.selection.on_timer(&mut self.events, now);
    }

    /// Time until the next debounced notification, for sizing poll timeouts
    pub fn next_timer_deadline(&self, now: Instant) -> Option<Duration> {
        self.selection.next_deadline(now)
    }

    // ---- layout persistence ------------------------------------------------

    /// Capture the column layout and sort; `None` without columns
    pub fn save_layout(&self) -> Result<Option<PersistedLayout>> {
        layout::capture(&self.columns, &self.panes, (self.sorted_column, self.sort_order))
    }

    pub fn restore_layout(&mut self, state: &PersistedLayout) -> Result<()> {
        self.suspended(|view| {
            let display = layout::apply_columns(&mut view.columns, state)?;
            view.sync.sync_columns(&view.columns, &mut view.panes)?;
            layout::apply_display_order(&view.columns, &mut view.panes, &display)?;
            view.apply_check_boxes()?;
            view.sync.relayout(&view.columns, &mut view.panes);

            if let Some((col, order)) = layout::resolve_sort(&view.columns, state) {
                view.sorted_column = col;
                view.sort_order = order;
            }

            if view.bridge.is_sortable() {
                if !view.bridge.column_sortable(view.sorted_column) {
                    if let Some(fallback) =
                        (0..view.columns.len()).find(|&i| view.bridge.column_sortable(i))
                    {
                        debug!(target: "layout",
                               "column {} not sortable, falling back to {}",
                               view.sorted_column, fallback);
                        view.sorted_column = fallback;
                    }
                }
                view.bridge.sort(view.sorted_column, view.sort_order)?;
            }

            view.refresh_sort_icon()?;
            view.invalidate();
            let visible = display.len();
            info!(target: "layout", "restored layout with {} visible columns", visible);
            Ok(())
        })
    }

    pub fn save_state(&self, store: &mut dyn SettingsStore, key: &str) -> Result<()> {
        match self.save_layout()? {
            Some(state) => store.write_state(key, &state.to_json()?),
            None => Ok(()),
        }
    }

    /// Restore from `store`; nothing stored is not an error
    pub fn restore_state(&mut self, store: &dyn SettingsStore, key: &str) -> Result<()> {
        match store.read_state(key)? {
            Some(json) if !json.trim().is_empty() => {
                self.restore_layout(&PersistedLayout::from_json(&json)?)
            }
            _ => Ok(()),
        }
    }

    // ---- paint queries -------------------------------------------------

    fn is_leading(&self, pane: Pane, visual: usize) -> bool {
        visual == 0 && pane == self.check_box_pane()
    }

    /// Text of the cell at `visual` in `pane`; empty for unmapped columns
    pub fn cell_text(&self, pane: Pane, row: usize, visual: usize) -> String {
        match self.columns.to_logical_index(pane, visual) {
            Some(col) => self.bridge.cell_text(&self.columns, row, col),
            None => String::new(),
        }
    }

    /// Icon slot of a cell
    pub fn cell_image(&mut self, pane: Pane, row: usize, visual: usize) -> Option<usize> {
        let col = self.columns.to_logical_index(pane, visual)?;
        let leading = self.is_leading(pane, visual);
        self.bridge.cell_image(row, col, leading)
    }

    pub fn icon(&self, index: usize) -> Option<&crate::data::table_model::Image> {
        self.bridge.icon(index)
    }

    /// Check state of a row's box, `None` when no box is shown
    pub fn cell_checked(&self, pane: Pane, row: usize, visual: usize) -> Option<bool> {
        if self.check_boxes && self.is_leading(pane, visual) {
            self.bridge.checked(row)
        } else {
            None
        }
    }

    pub fn cell_style(&self, pane: Pane, row: usize, visual: usize) -> Option<CellStyle> {
        let col = self.columns.to_logical_index(pane, visual)?;
        Some(self.bridge.cell_style(row, col))
    }

    pub fn row_style(&self, row: usize) -> CellStyle {
        self.bridge.row_style(row)
    }

    // ---- native dispatch -------------------------------------------------

    /// Handle input from one pane. Failures are logged, never propagated:
    /// one bad callback must not abort the host's event loop.
    pub fn handle_pane_event(&mut self, pane: Pane, event: PaneEvent) {
        self.handle_pane_event_at(pane, event, Instant::now());
    }

    pub fn handle_pane_event_at(&mut self, pane: Pane, event: PaneEvent, now: Instant) {
        if let Err(e) = self.dispatch(pane, event, now) {
            warn!(target: "table_view", "{:?} pane: {:?} failed: {}", pane, event, e);
        }
    }

    fn dispatch(&mut self, pane: Pane, event: PaneEvent, now: Instant) -> Result<()> {
        match event {
            PaneEvent::EraseBackground => {
                self.sync
                    .on_erase_background(&mut self.columns, &mut self.panes)?;
            }
            PaneEvent::ButtonDown {
                x,
                y,
                double,
                right,
                extend,
            } => self.on_button_down(pane, x, y, double, right, extend, now)?,
            PaneEvent::MouseMove { x, y } => {
                self.panes.get_mut(pane).mouse_move(x, y);
                self.sync.on_mouse_move(&mut self.panes, pane, y);
            }
            PaneEvent::MouseLeave => {
                self.panes.get_mut(pane).mouse_leave();
                self.sync.on_mouse_leave(&mut self.panes, pane);
            }
            PaneEvent::MouseWheel { delta_rows } => {
                self.sync.on_mouse_wheel(&mut self.panes, pane, delta_rows)?;
            }
            PaneEvent::KeyDown(key) => self.on_key_down(key, now)?,
            PaneEvent::SetFocus => self.sync.on_set_focus(&mut self.panes, pane),
            PaneEvent::KillFocus => self.sync.on_kill_focus(&mut self.panes, pane),
            PaneEvent::Scrolled { dy_rows } => {
                self.sync.on_scrolled(&mut self.panes, pane, dy_rows)?;
            }
            PaneEvent::ColumnClick(visual) => self.on_column_click(pane, visual)?,
            PaneEvent::ColumnResized { visual, width } => {
                let Some(col) = self.columns.to_logical_index(pane, visual) else {
                    trace!(target: "table_view", "resize of unmapped column {}", visual);
                    return Ok(());
                };
                self.set_column_width(col, width)?;
            }
            PaneEvent::ItemChanged {
                row,
                selected_before,
                selected_now,
            } => {
                self.selection.on_item_changed(
                    &mut self.panes,
                    &mut self.events,
                    row,
                    selected_before,
                    selected_now,
                    now,
                )?;
            }
            PaneEvent::OdStateChanged => {
                self.selection
                    .reconcile_from_native(&self.panes, &mut self.events, now);
            }
            PaneEvent::ItemActivate(row) => {
                self.selection
                    .on_item_activate(&mut self.panes, &mut self.events, row, now)?;
            }
            PaneEvent::CacheHint { from, to } => self.bridge.prepare_rows(from, to),
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn on_button_down(
        &mut self,
        pane: Pane,
        x: u16,
        y: u16,
        double: bool,
        right: bool,
        extend: bool,
        now: Instant,
    ) -> Result<()> {
        if pane == Pane::Normal {
            self.sync.focus_frozen(&mut self.panes);
        }

        let hit = self.panes.get(pane).hit_test(x, y);
        trace!(target: "table_view", "{:?} pane click at ({}, {}): {:?}", pane, x, y, hit);

        let row = match hit {
            HitTest::OnHeader(visual) => {
                if !double && !right {
                    self.on_column_click(pane, visual)?;
                }
                return Ok(());
            }
            HitTest::Nowhere => {
                if self.multi_selection() {
                    self.selection.publish_next_selection_clear();
                    self.panes
                        .try_each(|p| p.set_item_state(ItemTarget::All, ItemState::CLEAR))?;
                    self.selection.on_item_changed(
                        &mut self.panes,
                        &mut self.events,
                        None,
                        true,
                        false,
                        now,
                    )?;
                } else if self.check_boxes {
                    if self.current_index().is_some() {
                        self.set_current_index_at(None, now)?;
                    }
                } else {
                    // keep the current item
                    self.sync.focus_frozen(&mut self.panes);
                }
                return Ok(());
            }
            HitTest::OnItem(row) | HitTest::OnStateIcon(row) => row,
        };

        if double {
            self.selection.on_double_click(&mut self.events);
        } else if matches!(hit, HitTest::OnStateIcon(_))
            && self.check_boxes
            && self.bridge.has_item_checker()
        {
            self.toggle_item_checked(row)?;
        }

        if extend && self.multi_selection() {
            let select = !self.panes.normal.selected_rows().contains(&row);
            let state = if select {
                ItemState::CURRENT
            } else {
                ItemState::CLEAR
            };
            self.panes
                .try_each(|p| p.set_item_state(ItemTarget::Row(row), state))?;
            self.selection
                .reconcile_from_native(&self.panes, &mut self.events, now);
        } else {
            self.set_current_index_at(Some(row), now)?;
        }

        if double && !right {
            self.selection
                .on_item_activate(&mut self.panes, &mut self.events, row, now)?;
        }
        Ok(())
    }

    fn on_key_down(&mut self, key: Key, now: Instant) -> Result<()> {
        let count = self.item_count();
        let page = self.rows_per_page().max(1);
        let current = self.current_index();
        let last = count.saturating_sub(1);

        let target = match key {
            Key::Space => {
                if let Some(row) = current {
                    if self.check_boxes && self.bridge.has_item_checker() {
                        self.toggle_item_checked(row)?;
                    }
                }
                return Ok(());
            }
            Key::Enter => {
                if let Some(row) = current {
                    self.selection
                        .on_item_activate(&mut self.panes, &mut self.events, row, now)?;
                }
                return Ok(());
            }
            Key::Left => {
                self.panes.normal.scroll_horizontally(-HORIZONTAL_STEP)?;
                return Ok(());
            }
            Key::Right => {
                self.panes.normal.scroll_horizontally(HORIZONTAL_STEP)?;
                return Ok(());
            }
            _ if count == 0 => return Ok(()),
            Key::Up => current.map_or(0, |c| c.saturating_sub(1)),
            Key::Down => current.map_or(0, |c| (c + 1).min(last)),
            Key::PageUp => current.map_or(0, |c| c.saturating_sub(page)),
            Key::PageDown => current.map_or(0, |c| (c + page).min(last)),
            Key::Home => 0,
            Key::End => last,
        };

        if current != Some(target) {
            self.set_current_index_at(Some(target), now)?;
        }
        Ok(())
    }

    fn on_column_click(&mut self, pane: Pane, visual: usize) -> Result<()> {
        let Some(col) = self.columns.to_logical_index(pane, visual) else {
            trace!(target: "table_view", "click on unmapped header {} ignored", visual);
            return Ok(());
        };

        if self.sortable_by_header_click() && self.bridge.column_sortable(col) {
            let (prev_col, prev_order) = self
                .bridge
                .model_sort()
                .unwrap_or((self.sorted_column, self.sort_order));
            let order = if col != prev_col || prev_order == SortOrder::Descending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };

            match self.bridge.sort(col, order) {
                Ok(_) => {
                    self.sorted_column = col;
                    self.sort_order = order;
                    self.refresh_sort_icon()?;
                    self.invalidate();
                }
                Err(e) => warn!(target: "table_view", "sort by column {} failed: {}", col, e),
            }
        }

        self.events.publish(TableEvent::ColumnClicked(col));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_model::MemoryTableModel;
    use crate::data::value::CellValue;
    use crate::ui::terminal_pane::TerminalPane;
    use crate::utils::settings_store::MemorySettings;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn model() -> MemoryTableModel {
        let mut model = MemoryTableModel::new(vec!["id".into(), "name".into(), "qty".into()]);
        for (id, name, qty) in [(3, "c", 30), (1, "a", 10), (2, "b", 20)] {
            model.push_row(vec![
                CellValue::Integer(id),
                CellValue::Text(name.into()),
                CellValue::Integer(qty),
            ]);
        }
        model
    }

    fn view() -> TableView<TerminalPane> {
        let mut view = TableView::new(TerminalPane::new(), TerminalPane::new());
        view.set_columns(
            ColumnRegistry::with_columns([
                Column::new("id").with_frozen(true).with_width(5),
                Column::new("name").with_width(10),
                Column::new("qty").with_width(6),
            ])
            .unwrap(),
        )
        .unwrap();
        view.set_sortable_by_header_click(true).unwrap();
        view.set_bounds(Rect::new(0, 0, 40, 10));
        view.set_model(Some(Box::new(model()))).unwrap();
        view.drain_events();
        view
    }

    #[test]
    fn test_set_model_sorts_and_clears_current() {
        let view = view();
        assert_eq!(view.item_count(), 3);
        assert_eq!(view.current_index(), None);
        assert_eq!(view.cell_text(Pane::Frozen, 0, 0), "1");
        assert_eq!(view.cell_text(Pane::Normal, 2, 0), "c");
        assert_eq!(view.panes().frozen.sort_indicator(), Some((0, SortOrder::Ascending)));
        assert_eq!(view.panes().normal.sort_indicator(), None);
    }

    #[test]
    fn test_header_click_toggles_order() {
        let mut view = view();
        view.handle_pane_event(Pane::Normal, PaneEvent::ColumnClick(1));
        assert_eq!((view.sorted_column(), view.sort_order()), (2, SortOrder::Ascending));
        assert_eq!(view.panes().normal.sort_indicator(), Some((1, SortOrder::Ascending)));
        assert_eq!(view.panes().frozen.sort_indicator(), None);

        view.handle_pane_event(Pane::Normal, PaneEvent::ColumnClick(1));
        assert_eq!(view.sort_order(), SortOrder::Descending);
        assert_eq!(view.cell_text(Pane::Normal, 0, 1), "30");

        view.handle_pane_event(Pane::Normal, PaneEvent::ColumnClick(1));
        assert_eq!(view.sort_order(), SortOrder::Ascending);
        assert_eq!(
            view.event_history(),
            &[
                TableEvent::ColumnClicked(2),
                TableEvent::ColumnClicked(2),
                TableEvent::ColumnClicked(2)
            ]
        );
    }

    #[test]
    fn test_unmapped_header_click_is_ignored() {
        let mut view = view();
        view.handle_pane_event(Pane::Frozen, PaneEvent::ColumnClick(4));
        assert!(view.event_history().is_empty());
    }

    #[test]
    fn test_click_on_row_sets_current() {
        let mut view = view();
        view.handle_pane_event(
            Pane::Normal,
            PaneEvent::ButtonDown { x: 2, y: 2, double: false, right: false, extend: false },
        );
        assert_eq!(view.current_index(), Some(1));
        assert!(view.panes().normal.has_focus());
        assert_eq!(view.event_history(), &[TableEvent::CurrentIndexChanged(Some(1))]);
    }

    #[test]
    fn test_blank_click_keeps_current_in_single_mode() {
        let mut view = view();
        view.set_current_index(Some(0)).unwrap();
        view.handle_pane_event(
            Pane::Normal,
            PaneEvent::ButtonDown { x: 2, y: 8, double: false, right: false, extend: false },
        );
        assert_eq!(view.current_index(), Some(0));
    }

    #[test]
    fn test_double_click_activates() {
        let mut view = view();
        view.handle_pane_event(
            Pane::Frozen,
            PaneEvent::ButtonDown { x: 1, y: 3, double: true, right: false, extend: false },
        );
        assert_eq!(
            view.event_history(),
            &[
                TableEvent::CurrentIndexChanged(Some(2)),
                TableEvent::ItemActivated(2)
            ]
        );
    }

    #[test]
    fn test_keyboard_navigation() {
        let mut view = view();
        view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(Key::Down));
        assert_eq!(view.current_index(), Some(0));
        view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(Key::End));
        assert_eq!(view.current_index(), Some(2));
        view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(Key::Down));
        assert_eq!(view.current_index(), Some(2));
        view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(Key::Enter));
        assert_eq!(view.event_history().last(), Some(&TableEvent::ItemActivated(2)));
    }

    #[test]
    fn test_check_box_toggle_with_space() {
        let mut view = view();
        view.set_check_boxes(true).unwrap();
        assert!(view.panes().frozen.style(PaneStyle::CheckBoxes));
        assert!(!view.panes().normal.style(PaneStyle::CheckBoxes));

        view.set_current_index(Some(1)).unwrap();
        assert_eq!(view.cell_checked(Pane::Frozen, 1, 0), Some(false));
        view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(Key::Space));
        assert_eq!(view.cell_checked(Pane::Frozen, 1, 0), Some(true));
        assert_eq!(view.cell_checked(Pane::Normal, 1, 0), None);
    }

    /// Rows shared with the test so it can mutate them behind the view
    struct SharedRows(Rc<RefCell<Vec<i64>>>);

    impl TableModel for SharedRows {
        fn row_count(&self) -> usize {
            self.0.borrow().len()
        }

        fn value(&self, row: usize, _col: usize) -> CellValue {
            self.0.borrow().get(row).map_or(CellValue::Null, |&v| CellValue::Integer(v))
        }
    }

    #[test]
    fn test_rows_inserted_before_current_moves_it() {
        let rows = Rc::new(RefCell::new(vec![1, 2, 3]));
        let mut view = view();
        view.set_model(Some(Box::new(SharedRows(rows.clone())))).unwrap();
        view.set_current_index(Some(2)).unwrap();

        rows.borrow_mut().splice(0..0, [7, 8]);
        view.on_model_event(ModelEvent::RowsInserted { from: 0, to: 1 }).unwrap();
        assert_eq!(view.item_count(), 5);
        assert_eq!(view.current_index(), Some(4));

        rows.borrow_mut().drain(3..5);
        view.on_model_event(ModelEvent::RowsRemoved { from: 3, to: 4 }).unwrap();
        assert_eq!(view.item_count(), 3);
        assert_eq!(view.current_index(), None);
    }

    #[test]
    fn test_plain_model_shows_no_sort_indicator() {
        let mut view = view();
        view.set_model(Some(Box::new(SharedRows(Rc::new(RefCell::new(vec![1]))))))
            .unwrap();
        assert_eq!(view.panes().frozen.sort_indicator(), None);
        view.handle_pane_event(Pane::Frozen, PaneEvent::ColumnClick(0));
        assert_eq!(view.event_history().last(), Some(&TableEvent::ColumnClicked(0)));
        assert_eq!(view.sorted_column(), 0);
    }

    #[test]
    fn test_layout_round_trip_through_settings() {
        let mut store = MemorySettings::new();
        let mut view = view();
        view.panes_mut().normal.set_column_order(&[1, 0]).unwrap();
        view.sort_by(2, SortOrder::Descending).unwrap();
        view.save_state(&mut store, "orders").unwrap();

        let mut restored = TableView::new(TerminalPane::new(), TerminalPane::new());
        restored.set_columns(view.columns().clone()).unwrap();
        restored.set_model(Some(Box::new(model()))).unwrap();
        restored.restore_state(&store, "orders").unwrap();

        assert_eq!((restored.sorted_column(), restored.sort_order()), (2, SortOrder::Descending));
        assert_eq!(restored.panes().normal.column_order().unwrap(), vec![1, 0]);
        assert_eq!(restored.cell_text(Pane::Frozen, 0, 0), "3");
        assert!(restored.panes().normal.redraw_enabled());
    }

    #[test]
    fn test_restore_without_stored_state_is_noop() {
        let store = MemorySettings::new();
        let mut view = view();
        view.restore_state(&store, "missing").unwrap();
        assert_eq!(view.columns().len(), 3);
    }

    #[test]
    fn test_hiding_column_keeps_other_pane_order() {
        let mut view = view();
        view.add_column(Column::new("extra").with_width(4)).unwrap();
        view.panes_mut().normal.set_column_order(&[2, 0, 1]).unwrap();

        view.set_column_visible(1, false).unwrap();
        let names: Vec<&str> = view
            .visible_columns_in_display_order()
            .unwrap()
            .into_iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["id", "extra", "qty"]);
        assert_eq!(view.columns().frozen_visible_count(), 1);
    }
}
