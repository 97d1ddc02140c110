//! In-memory list control for terminal rendering
//!
//! [`TerminalPane`] keeps the state a native list control would keep (item
//! count, selection, focus, scroll offsets, header order) and answers hit
//! tests in cell coordinates. One row is one cell high, so pixel-based
//! scroll requests are row counts.

use ratatui::layout::Rect;
use std::collections::{BTreeSet, HashSet};
use tracing::trace;

use crate::data::table_model::SortOrder;
use crate::error::NativeError;
use crate::ui::pane::{HitTest, ItemState, ItemTarget, NativePane, PaneStyle};

/// Cells taken by the check box at the start of the leading column
pub const CHECK_BOX_WIDTH: u16 = 2;

/// One column as laid out on screen, in content coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub visual: usize,
    pub start: u16,
    pub width: u16,
}

#[derive(Debug, Clone)]
pub struct TerminalPane {
    item_count: usize,
    selected: BTreeSet<usize>,
    focused_row: Option<usize>,
    top_row: usize,
    horizontal_offset: u16,
    bounds: Rect,
    column_widths: Vec<u16>,
    column_order: Vec<usize>,
    sort_indicator: Option<(usize, SortOrder)>,
    styles: HashSet<PaneStyle>,
    has_focus: bool,
    hover: Option<(u16, u16)>,
    redraw_enabled: bool,
    needs_repaint: bool,
    dirty_rows: BTreeSet<usize>,
}

impl Default for TerminalPane {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPane {
    pub fn new() -> Self {
        Self {
            item_count: 0,
            selected: BTreeSet::new(),
            focused_row: None,
            top_row: 0,
            horizontal_offset: 0,
            bounds: Rect::default(),
            column_widths: Vec::new(),
            column_order: Vec::new(),
            sort_indicator: None,
            styles: HashSet::new(),
            has_focus: false,
            hover: None,
            redraw_enabled: true,
            needs_repaint: true,
            dirty_rows: BTreeSet::new(),
        }
    }

    pub fn hover(&self) -> Option<(u16, u16)> {
        self.hover
    }

    pub fn horizontal_offset(&self) -> u16 {
        self.horizontal_offset
    }

    pub fn focused_row(&self) -> Option<usize> {
        self.focused_row
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selected.contains(&row)
    }

    pub fn sort_indicator(&self) -> Option<(usize, SortOrder)> {
        self.sort_indicator
    }

    pub fn redraw_enabled(&self) -> bool {
        self.redraw_enabled
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint || !self.dirty_rows.is_empty()
    }

    /// Rows queued for repaint since the last call, clearing the queue
    pub fn take_dirty_rows(&mut self) -> Vec<usize> {
        self.needs_repaint = false;
        std::mem::take(&mut self.dirty_rows).into_iter().collect()
    }

    pub fn header_height(&self) -> u16 {
        if self.styles.contains(&PaneStyle::HeaderHidden) {
            0
        } else {
            1
        }
    }

    /// Total width of all columns
    pub fn content_width(&self) -> u16 {
        self.column_widths
            .iter()
            .fold(0u16, |acc, &w| acc.saturating_add(w))
    }

    /// Columns in display order with their content-space positions
    pub fn column_spans(&self) -> Vec<ColumnSpan> {
        let mut start = 0u16;
        self.column_order
            .iter()
            .filter_map(|&visual| {
                let width = *self.column_widths.get(visual)?;
                let span = ColumnSpan {
                    visual,
                    start,
                    width,
                };
                start = start.saturating_add(width);
                Some(span)
            })
            .collect()
    }

    /// Rows currently on screen
    pub fn visible_rows(&self) -> std::ops::Range<usize> {
        let end = (self.top_row + self.rows_per_page()).min(self.item_count);
        self.top_row.min(end)..end
    }

    fn max_top_row(&self) -> usize {
        self.item_count.saturating_sub(self.rows_per_page().max(1))
    }

    fn max_horizontal_offset(&self) -> u16 {
        self.content_width().saturating_sub(self.bounds.width)
    }

    fn check_row(&self, row: usize, op: &'static str) -> Result<(), NativeError> {
        if row < self.item_count {
            Ok(())
        } else {
            Err(NativeError::new(op))
        }
    }

    fn column_at(&self, x: u16) -> Option<ColumnSpan> {
        let x = x.saturating_add(self.horizontal_offset);
        self.column_spans()
            .into_iter()
            .find(|span| x >= span.start && x < span.start.saturating_add(span.width))
    }
}

impl NativePane for TerminalPane {
    fn set_item_count(&mut self, count: usize) -> Result<(), NativeError> {
        self.item_count = count;
        self.selected.retain(|&row| row < count);
        if self.focused_row.is_some_and(|row| row >= count) {
            self.focused_row = None;
        }
        self.top_row = self.top_row.min(self.max_top_row());
        self.needs_repaint = true;
        Ok(())
    }

    fn item_count(&self) -> usize {
        self.item_count
    }

    fn set_item_state(&mut self, target: ItemTarget, state: ItemState) -> Result<(), NativeError> {
        match target {
            ItemTarget::All => {
                if state.selected && self.styles.contains(&PaneStyle::MultiSelection) {
                    self.selected = (0..self.item_count).collect();
                } else if !state.selected {
                    self.selected.clear();
                }
                if !state.focused {
                    self.focused_row = None;
                }
            }
            ItemTarget::Row(row) => {
                self.check_row(row, "set_item_state")?;
                if state.selected {
                    if !self.styles.contains(&PaneStyle::MultiSelection) {
                        self.selected.clear();
                    }
                    self.selected.insert(row);
                } else {
                    self.selected.remove(&row);
                }
                if state.focused {
                    self.focused_row = Some(row);
                } else if self.focused_row == Some(row) {
                    self.focused_row = None;
                }
            }
        }
        self.needs_repaint = true;
        Ok(())
    }

    fn selected_rows(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    fn ensure_visible(&mut self, row: usize) -> Result<(), NativeError> {
        self.check_row(row, "ensure_visible")?;
        let page = self.rows_per_page().max(1);
        if row < self.top_row {
            self.top_row = row;
        } else if row >= self.top_row + page {
            self.top_row = row + 1 - page;
        }
        Ok(())
    }

    fn redraw_row(&mut self, row: usize) -> Result<(), NativeError> {
        self.check_row(row, "redraw_row")?;
        self.dirty_rows.insert(row);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.needs_repaint = true;
    }

    fn scroll_by(&mut self, dy: i32) -> Result<(), NativeError> {
        let target = self.top_row as i64 + i64::from(dy);
        self.top_row = target.clamp(0, self.max_top_row() as i64) as usize;
        trace!(target: "pane_sync", "scroll_by({}) -> top_row={}", dy, self.top_row);
        Ok(())
    }

    fn row_height(&self) -> u16 {
        1
    }

    fn top_row(&self) -> usize {
        self.top_row
    }

    fn rows_per_page(&self) -> usize {
        self.bounds
            .height
            .saturating_sub(self.header_height())
            .saturating_sub(self.horizontal_scrollbar_height()) as usize
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.horizontal_offset = self.horizontal_offset.min(self.max_horizontal_offset());
        self.top_row = self.top_row.min(self.max_top_row());
        self.needs_repaint = true;
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn horizontal_scrollbar_height(&self) -> u16 {
        if self.content_width() > self.bounds.width {
            1
        } else {
            0
        }
    }

    fn scroll_horizontally(&mut self, dx: i32) -> Result<(), NativeError> {
        let target = i32::from(self.horizontal_offset) + dx;
        self.horizontal_offset = target.clamp(0, i32::from(self.max_horizontal_offset())) as u16;
        Ok(())
    }

    fn set_column_widths(&mut self, widths: &[u16]) -> Result<(), NativeError> {
        if widths.len() != self.column_widths.len() {
            self.column_order = (0..widths.len()).collect();
            if self
                .sort_indicator
                .is_some_and(|(visual, _)| visual >= widths.len())
            {
                self.sort_indicator = None;
            }
        }
        self.column_widths = widths.to_vec();
        self.horizontal_offset = self.horizontal_offset.min(self.max_horizontal_offset());
        self.needs_repaint = true;
        Ok(())
    }

    fn column_widths(&self) -> Vec<u16> {
        self.column_widths.clone()
    }

    fn column_order(&self) -> Result<Vec<usize>, NativeError> {
        Ok(self.column_order.clone())
    }

    fn set_column_order(&mut self, order: &[usize]) -> Result<(), NativeError> {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        if !sorted.iter().copied().eq(0..self.column_widths.len()) {
            return Err(NativeError::new("set_column_order"));
        }
        self.column_order = order.to_vec();
        self.needs_repaint = true;
        Ok(())
    }

    fn set_sort_indicator(
        &mut self,
        indicator: Option<(usize, SortOrder)>,
    ) -> Result<(), NativeError> {
        if indicator.is_some_and(|(visual, _)| visual >= self.column_widths.len()) {
            return Err(NativeError::new("set_sort_indicator"));
        }
        self.sort_indicator = indicator;
        self.needs_repaint = true;
        Ok(())
    }

    fn set_style(&mut self, style: PaneStyle, enabled: bool) -> Result<(), NativeError> {
        if enabled {
            self.styles.insert(style);
        } else {
            self.styles.remove(&style);
        }
        self.needs_repaint = true;
        Ok(())
    }

    fn style(&self, style: PaneStyle) -> bool {
        self.styles.contains(&style)
    }

    fn set_focus(&mut self) {
        self.has_focus = true;
    }

    fn kill_focus(&mut self) {
        self.has_focus = false;
    }

    fn has_focus(&self) -> bool {
        self.has_focus
    }

    fn hit_test(&self, x: u16, y: u16) -> HitTest {
        if x >= self.bounds.width || y >= self.bounds.height {
            return HitTest::Nowhere;
        }

        let header = self.header_height();
        if y < header {
            return self
                .column_at(x)
                .map_or(HitTest::Nowhere, |span| HitTest::OnHeader(span.visual));
        }

        let offset = usize::from(y - header);
        if offset >= self.rows_per_page() {
            return HitTest::Nowhere;
        }
        let row = self.top_row + offset;
        if row >= self.item_count {
            return HitTest::Nowhere;
        }

        match self.column_at(x) {
            None => HitTest::Nowhere,
            Some(span)
                if span.visual == 0
                    && self.styles.contains(&PaneStyle::CheckBoxes)
                    && x.saturating_add(self.horizontal_offset) < span.start + CHECK_BOX_WIDTH =>
            {
                HitTest::OnStateIcon(row)
            }
            Some(_) => HitTest::OnItem(row),
        }
    }

    fn mouse_move(&mut self, x: u16, y: u16) {
        self.hover = Some((x, y));
    }

    fn mouse_leave(&mut self) {
        self.hover = None;
    }

    fn set_redraw(&mut self, enabled: bool) {
        self.redraw_enabled = enabled;
        if enabled {
            self.needs_repaint = true;
        }
    }
}
