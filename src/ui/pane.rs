//! Native pane interface
//!
//! The table is drawn by two independent native list controls: the frozen
//! pane on the left and the horizontally scrollable normal pane. The core
//! never constructs them; it drives them through [`NativePane`].

use ratatui::layout::Rect;

use crate::error::NativeError;
use crate::data::table_model::SortOrder;

/// Which of the two panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Frozen,
    Normal,
}

impl Pane {
    pub fn other(self) -> Pane {
        match self {
            Pane::Frozen => Pane::Normal,
            Pane::Normal => Pane::Frozen,
        }
    }
}

/// Rows addressed by an item-state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTarget {
    All,
    Row(usize),
}

/// Focus/selection bits of a native row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemState {
    pub focused: bool,
    pub selected: bool,
}

impl ItemState {
    pub const CLEAR: ItemState = ItemState {
        focused: false,
        selected: false,
    };
    pub const CURRENT: ItemState = ItemState {
        focused: true,
        selected: true,
    };
    pub const SELECTED: ItemState = ItemState {
        focused: false,
        selected: true,
    };
}

/// Result of hit testing a point inside a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTest {
    Nowhere,
    OnItem(usize),
    /// On the check box of a row
    OnStateIcon(usize),
    /// On a column header, by visual index
    OnHeader(usize),
}

/// Style switches mirrored onto both panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneStyle {
    HeaderHidden,
    MultiSelection,
    CheckBoxes,
    ColumnsOrderable,
    ColumnsSizable,
    SortableHeader,
}

/// Operations the core needs from one native list control
pub trait NativePane {
    fn set_item_count(&mut self, count: usize) -> Result<(), NativeError>;

    fn item_count(&self) -> usize;

    fn set_item_state(&mut self, target: ItemTarget, state: ItemState) -> Result<(), NativeError>;

    /// Selected rows in native enumeration order
    fn selected_rows(&self) -> Vec<usize>;

    fn ensure_visible(&mut self, row: usize) -> Result<(), NativeError>;

    fn redraw_row(&mut self, row: usize) -> Result<(), NativeError>;

    fn invalidate(&mut self);

    /// Scroll vertically by `dy` pixels (one row is `row_height` pixels)
    fn scroll_by(&mut self, dy: i32) -> Result<(), NativeError>;

    fn row_height(&self) -> u16;

    /// First row currently shown
    fn top_row(&self) -> usize;

    /// Number of fully visible rows
    fn rows_per_page(&self) -> usize;

    fn set_bounds(&mut self, bounds: Rect);

    fn bounds(&self) -> Rect;

    /// Height reserved for a horizontal scroll bar, 0 when none is shown
    fn horizontal_scrollbar_height(&self) -> u16;

    /// Scroll horizontally by `dx` cells
    fn scroll_horizontally(&mut self, dx: i32) -> Result<(), NativeError>;

    /// Column widths by visual index. A change in column count resets the
    /// display order to identity.
    fn set_column_widths(&mut self, widths: &[u16]) -> Result<(), NativeError>;

    fn column_widths(&self) -> Vec<u16>;

    /// Native display order: entry `i` is the visual column shown at position `i`
    fn column_order(&self) -> Result<Vec<usize>, NativeError>;

    fn set_column_order(&mut self, order: &[usize]) -> Result<(), NativeError>;

    /// Show a sort indicator on one header (by visual index), clearing others
    fn set_sort_indicator(&mut self, indicator: Option<(usize, SortOrder)>)
        -> Result<(), NativeError>;

    fn set_style(&mut self, style: PaneStyle, enabled: bool) -> Result<(), NativeError>;

    fn style(&self, style: PaneStyle) -> bool;

    fn set_focus(&mut self);

    fn kill_focus(&mut self);

    fn has_focus(&self) -> bool;

    fn hit_test(&self, x: u16, y: u16) -> HitTest;

    /// Deliver a forwarded pointer position (hover/drag tracking)
    fn mouse_move(&mut self, x: u16, y: u16);

    fn mouse_leave(&mut self);

    /// Enable or suspend redrawing
    fn set_redraw(&mut self, enabled: bool);
}

/// The two panes of one table, addressable by [`Pane`]
pub struct PanePair<P> {
    pub frozen: P,
    pub normal: P,
}

impl<P: NativePane> PanePair<P> {
    pub fn new(frozen: P, normal: P) -> Self {
        Self { frozen, normal }
    }

    pub fn get(&self, pane: Pane) -> &P {
        match pane {
            Pane::Frozen => &self.frozen,
            Pane::Normal => &self.normal,
        }
    }

    pub fn get_mut(&mut self, pane: Pane) -> &mut P {
        match pane {
            Pane::Frozen => &mut self.frozen,
            Pane::Normal => &mut self.normal,
        }
    }

    /// Apply a fallible native call to the frozen pane, then the normal pane
    pub fn try_each<F>(&mut self, mut f: F) -> Result<(), NativeError>
    where
        F: FnMut(&mut P) -> Result<(), NativeError>,
    {
        f(&mut self.frozen)?;
        f(&mut self.normal)
    }

    pub fn each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut P),
    {
        f(&mut self.frozen);
        f(&mut self.normal);
    }
}
