//! Keeps the frozen and normal panes behaving as one viewport
//!
//! The normal pane leads vertical scrolling and owns the wheel; the frozen
//! pane leads focus. Every propagation runs under a reentrancy flag so a
//! forwarded event that comes back through the other pane is dropped.

use ratatui::layout::Rect;
use tracing::{debug, trace};

use crate::column_manager::ColumnRegistry;
use crate::error::{NativeError, Result};
use crate::state::layout::pane_display_order;
use crate::ui::pane::{NativePane, Pane, PanePair};
use crate::ui::reentrancy::ReentrancyFlag;

/// Narrowest width a stretched column is given
pub const MIN_STRETCHED_WIDTH: u16 = 4;

#[derive(Debug, Default)]
pub struct PaneSynchronizer {
    client: Rect,
    last_column_stretched: bool,
    scrolling: ReentrancyFlag,
    in_mouse_event: ReentrancyFlag,
    in_erase_bkgnd: ReentrancyFlag,
}

impl PaneSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_bounds(&self) -> Rect {
        self.client
    }

    pub fn last_column_stretched(&self) -> bool {
        self.last_column_stretched
    }

    pub fn set_last_column_stretched(&mut self, stretched: bool) {
        self.last_column_stretched = stretched;
    }

    /// Push the registry's per-pane column widths into the panes
    pub fn sync_columns<P: NativePane>(
        &self,
        columns: &ColumnRegistry,
        panes: &mut PanePair<P>,
    ) -> std::result::Result<(), NativeError> {
        for pane in [Pane::Frozen, Pane::Normal] {
            let widths: Vec<u16> = columns
                .pane_columns(pane)
                .iter()
                .filter_map(|&i| columns.get(i))
                .map(|c| c.width())
                .collect();
            panes.get_mut(pane).set_column_widths(&widths)?;
        }
        Ok(())
    }

    /// Place both panes inside `client`
    pub fn layout<P: NativePane>(
        &mut self,
        columns: &ColumnRegistry,
        panes: &mut PanePair<P>,
        client: Rect,
    ) {
        self.client = client;
        self.relayout(columns, panes);
    }

    /// Re-place both panes inside the last client rectangle.
    ///
    /// The frozen pane spans the frozen column width; the normal pane takes
    /// the rest. The frozen pane stops above the normal pane's horizontal
    /// scroll bar so their rows stay aligned.
    pub fn relayout<P: NativePane>(&self, columns: &ColumnRegistry, panes: &mut PanePair<P>) {
        let client = self.client;
        let frozen_width = columns.frozen_width().min(client.width);

        panes.normal.set_bounds(Rect::new(
            client.x + frozen_width,
            client.y,
            client.width - frozen_width,
            client.height,
        ));

        let scrollbar = panes.normal.horizontal_scrollbar_height();
        panes.frozen.set_bounds(Rect::new(
            client.x,
            client.y,
            frozen_width,
            client.height.saturating_sub(scrollbar),
        ));

        debug!(target: "pane_sync",
               "layout: client={:?} frozen_width={} scrollbar={}",
               client, frozen_width, scrollbar);
    }

    /// `source` scrolled by `dy_rows`; scroll the other pane by the same amount
    pub fn on_scrolled<P: NativePane>(
        &self,
        panes: &mut PanePair<P>,
        source: Pane,
        dy_rows: i32,
    ) -> std::result::Result<(), NativeError> {
        let Some(_guard) = self.scrolling.enter() else {
            trace!(target: "pane_sync", "scroll echo from {:?} dropped", source);
            return Ok(());
        };
        if dy_rows == 0 {
            return Ok(());
        }

        let dy = dy_rows * i32::from(panes.get(source).row_height());
        trace!(target: "pane_sync", "{:?} scrolled {} rows, following", source, dy_rows);
        panes.get_mut(source.other()).scroll_by(dy)
    }

    /// Wheel input on either pane scrolls the normal pane, which the frozen
    /// pane then follows
    pub fn on_mouse_wheel<P: NativePane>(
        &self,
        panes: &mut PanePair<P>,
        source: Pane,
        delta_rows: i32,
    ) -> std::result::Result<(), NativeError> {
        if source == Pane::Frozen {
            trace!(target: "pane_sync", "forwarding wheel to normal pane");
        }

        let before = panes.normal.top_row();
        let dy = delta_rows * i32::from(panes.normal.row_height());
        panes.normal.scroll_by(dy)?;
        let moved = panes.normal.top_row() as i64 - before as i64;

        self.on_scrolled(panes, Pane::Normal, moved as i32)
    }

    /// Mirror the pointer row into the other pane; the x coordinate is
    /// dropped so hover tracking never scrolls the other pane sideways
    pub fn on_mouse_move<P: NativePane>(&self, panes: &mut PanePair<P>, source: Pane, y: u16) {
        let Some(_guard) = self.in_mouse_event.enter() else {
            return;
        };
        panes.get_mut(source.other()).mouse_move(0, y);
    }

    pub fn on_mouse_leave<P: NativePane>(&self, panes: &mut PanePair<P>, source: Pane) {
        let Some(_guard) = self.in_mouse_event.enter() else {
            return;
        };
        panes.get_mut(source.other()).mouse_leave();
    }

    /// A pane received input focus
    pub fn on_set_focus<P: NativePane>(&self, panes: &mut PanePair<P>, pane: Pane) {
        if pane == Pane::Frozen {
            trace!(target: "pane_sync", "frozen pane focused, handing focus to normal pane");
            panes.frozen.kill_focus();
            panes.normal.set_focus();
        }
    }

    pub fn on_kill_focus<P: NativePane>(&self, panes: &mut PanePair<P>, pane: Pane) {
        if pane == Pane::Normal {
            panes.frozen.kill_focus();
        }
    }

    /// Route focus through the frozen pane, the canonical focus owner
    pub fn focus_frozen<P: NativePane>(&self, panes: &mut PanePair<P>) {
        panes.frozen.set_focus();
        self.on_set_focus(panes, Pane::Frozen);
    }

    /// Background erase: stretch the last column when enabled.
    /// Returns whether a width changed.
    pub fn on_erase_background<P: NativePane>(
        &self,
        columns: &mut ColumnRegistry,
        panes: &mut PanePair<P>,
    ) -> Result<bool> {
        if !self.last_column_stretched {
            return Ok(false);
        }
        let Some(_guard) = self.in_erase_bkgnd.enter() else {
            trace!(target: "pane_sync", "stretch already in progress");
            return Ok(false);
        };
        self.stretch_last_column(columns, panes)
    }

    /// Widen the last normal-pane column (in display order) to fill the
    /// remaining width. Idempotent.
    pub fn stretch_last_column<P: NativePane>(
        &self,
        columns: &mut ColumnRegistry,
        panes: &mut PanePair<P>,
    ) -> Result<bool> {
        let display = pane_display_order(columns, panes, Pane::Normal)?;
        let Some((&last, others)) = display.split_last() else {
            return Ok(false);
        };

        let used = others
            .iter()
            .filter_map(|&i| columns.get(i))
            .fold(0u16, |acc, c| acc.saturating_add(c.width()));
        let target = panes
            .normal
            .bounds()
            .width
            .saturating_sub(used)
            .max(MIN_STRETCHED_WIDTH);

        if columns.get(last).map(|c| c.width()) == Some(target) {
            return Ok(false);
        }

        debug!(target: "pane_sync", "stretching column {} to {}", last, target);
        columns.set_width(last, target)?;
        self.sync_columns(columns, panes)?;
        self.relayout(columns, panes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_manager::Column;
    use crate::ui::terminal_pane::TerminalPane;

    fn setup() -> (ColumnRegistry, PanePair<TerminalPane>, PaneSynchronizer) {
        let columns = ColumnRegistry::with_columns([
            Column::new("id").with_frozen(true).with_width(6),
            Column::new("name").with_width(20),
            Column::new("qty").with_width(8),
        ])
        .unwrap();
        let mut panes = PanePair::new(TerminalPane::new(), TerminalPane::new());
        panes.each(|p| {
            let _ = p.set_item_count(100);
        });
        let mut sync = PaneSynchronizer::new();
        sync.sync_columns(&columns, &mut panes).unwrap();
        sync.layout(&columns, &mut panes, Rect::new(0, 0, 60, 12));
        (columns, panes, sync)
    }

    #[test]
    fn test_layout_splits_at_frozen_width() {
        let (_, panes, _) = setup();
        assert_eq!(panes.frozen.bounds(), Rect::new(0, 0, 6, 12));
        assert_eq!(panes.normal.bounds(), Rect::new(6, 0, 54, 12));
    }

    #[test]
    fn test_frozen_pane_clears_normal_scrollbar() {
        let (columns, mut panes, mut sync) = setup();
        sync.layout(&columns, &mut panes, Rect::new(0, 0, 20, 12));
        assert_eq!(panes.normal.horizontal_scrollbar_height(), 1);
        assert_eq!(panes.frozen.bounds().height, 11);
        assert_eq!(panes.normal.bounds().height, 12);
    }

    #[test]
    fn test_wheel_on_frozen_scrolls_both() {
        let (_, mut panes, sync) = setup();
        sync.on_mouse_wheel(&mut panes, Pane::Frozen, 3).unwrap();
        assert_eq!(panes.normal.top_row(), 3);
        assert_eq!(panes.frozen.top_row(), 3);

        sync.on_mouse_wheel(&mut panes, Pane::Normal, -10).unwrap();
        assert_eq!(panes.normal.top_row(), 0);
        assert_eq!(panes.frozen.top_row(), 0);
    }

    #[test]
    fn test_nested_scroll_is_dropped() {
        let (_, mut panes, sync) = setup();
        let _outer = sync.scrolling.enter();
        sync.on_scrolled(&mut panes, Pane::Normal, 4).unwrap();
        assert_eq!(panes.frozen.top_row(), 0);
    }

    #[test]
    fn test_mouse_move_forwards_row_only() {
        let (_, mut panes, sync) = setup();
        sync.on_mouse_move(&mut panes, Pane::Normal, 5);
        assert_eq!(panes.frozen.hover(), Some((0, 5)));
        sync.on_mouse_leave(&mut panes, Pane::Frozen);
        assert_eq!(panes.normal.hover(), None);
    }

    #[test]
    fn test_focus_ends_on_normal_pane() {
        let (_, mut panes, sync) = setup();
        sync.focus_frozen(&mut panes);
        assert!(panes.normal.has_focus());
        assert!(!panes.frozen.has_focus());
    }

    #[test]
    fn test_stretch_is_idempotent() {
        let (mut columns, mut panes, mut sync) = setup();
        sync.set_last_column_stretched(true);

        assert!(sync.on_erase_background(&mut columns, &mut panes).unwrap());
        assert_eq!(columns.get(2).unwrap().width(), 34);
        assert!(!sync.on_erase_background(&mut columns, &mut panes).unwrap());
        assert_eq!(columns.get(2).unwrap().width(), 34);
        assert_eq!(panes.normal.column_widths(), vec![20, 34]);
    }

    #[test]
    fn test_stretch_skipped_while_in_progress() {
        let (mut columns, mut panes, mut sync) = setup();
        sync.set_last_column_stretched(true);
        let _outer = sync.in_erase_bkgnd.enter();
        assert!(!sync.on_erase_background(&mut columns, &mut panes).unwrap());
        assert_eq!(columns.get(2).unwrap().width(), 8);
    }
}
