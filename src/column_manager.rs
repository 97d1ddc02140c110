//! Column registry: the master column order and its per-pane projections
//!
//! Columns live in one logical sequence. Each pane (frozen, normal) shows
//! the visible columns whose `frozen` flag matches it, and numbers them from
//! zero in logical order. Those per-pane numbers are the visual indices the
//! native panes use.

use std::cell::OnceCell;
use tracing::trace;

use crate::error::{Result, TableError};
use crate::ui::pane::Pane;

/// Default column width in cells if none was given
pub const DEFAULT_COLUMN_WIDTH: u16 = 15;
/// Default format template; `{}` is replaced by the value
pub const DEFAULT_FORMAT: &str = "{}";

/// One column descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    title: String,
    title_override: String,
    format: String,
    precision: usize,
    width: u16,
    frozen: bool,
    visible: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            title_override: String::new(),
            format: DEFAULT_FORMAT.to_string(),
            precision: 0,
            width: DEFAULT_COLUMN_WIDTH,
            frozen: false,
            visible: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_override(&self) -> &str {
        &self.title_override
    }

    /// The title shown in the header
    pub fn display_title(&self) -> &str {
        if self.title_override.is_empty() {
            &self.title
        } else {
            &self.title_override
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Fraction digits for numeric values; 0 means "use the default"
    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn pane(&self) -> Pane {
        if self.frozen {
            Pane::Frozen
        } else {
            Pane::Normal
        }
    }
}

/// Cached logical <-> visual projection, rebuilt on first query after a change
#[derive(Debug, Clone, Default)]
struct PaneMapping {
    /// Visual index per logical column (`None` when hidden)
    visual: Vec<Option<usize>>,
    /// Logical index per visual position in the frozen pane
    frozen: Vec<usize>,
    /// Logical index per visual position in the normal pane
    normal: Vec<usize>,
}

impl PaneMapping {
    fn build(columns: &[Column]) -> Self {
        let mut mapping = PaneMapping {
            visual: Vec::with_capacity(columns.len()),
            ..Default::default()
        };

        for (logical, column) in columns.iter().enumerate() {
            if !column.visible {
                mapping.visual.push(None);
                continue;
            }
            let pane_columns = if column.frozen {
                &mut mapping.frozen
            } else {
                &mut mapping.normal
            };
            mapping.visual.push(Some(pane_columns.len()));
            pane_columns.push(logical);
        }

        trace!(target: "column_registry",
               "rebuilt mapping: frozen={:?} normal={:?}", mapping.frozen, mapping.normal);
        mapping
    }
}

/// Owns the ordered set of columns and answers index-mapping queries
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
    mapping: OnceCell<PaneMapping>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        let mut registry = Self::new();
        for column in columns {
            registry.add(column)?;
        }
        Ok(registry)
    }

    fn invalidate(&mut self) {
        self.mapping.take();
    }

    fn mapping(&self) -> &PaneMapping {
        self.mapping.get_or_init(|| PaneMapping::build(&self.columns))
    }

    fn column_mut(&mut self, index: usize) -> Result<&mut Column> {
        self.columns
            .get_mut(index)
            .ok_or(TableError::ColumnIndex(index))
    }

    /// Append a column; names must be unique
    pub fn add(&mut self, column: Column) -> Result<usize> {
        let index = self.columns.len();
        self.insert(index, column)?;
        Ok(index)
    }

    pub fn insert(&mut self, index: usize, column: Column) -> Result<()> {
        if index > self.columns.len() {
            return Err(TableError::ColumnIndex(index));
        }
        if self.index_of(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        self.columns.insert(index, column);
        self.invalidate();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Column> {
        if index >= self.columns.len() {
            return Err(TableError::ColumnIndex(index));
        }
        let column = self.columns.remove(index);
        self.invalidate();
        Ok(column)
    }

    /// Move a column within the logical order
    pub fn move_column(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.columns.len();
        if from >= len {
            return Err(TableError::ColumnIndex(from));
        }
        if to >= len {
            return Err(TableError::ColumnIndex(to));
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        self.invalidate();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.invalidate();
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        let column = self.column_mut(index)?;
        if column.visible != visible {
            column.visible = visible;
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_frozen(&mut self, index: usize, frozen: bool) -> Result<()> {
        let column = self.column_mut(index)?;
        if column.frozen != frozen {
            column.frozen = frozen;
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_width(&mut self, index: usize, width: u16) -> Result<()> {
        self.column_mut(index)?.width = width;
        Ok(())
    }

    pub fn set_title(&mut self, index: usize, title: impl Into<String>) -> Result<()> {
        self.column_mut(index)?.title = title.into();
        Ok(())
    }

    pub fn set_title_override(&mut self, index: usize, title: impl Into<String>) -> Result<()> {
        self.column_mut(index)?.title_override = title.into();
        Ok(())
    }

    pub fn set_format(&mut self, index: usize, format: impl Into<String>) -> Result<()> {
        self.column_mut(index)?.format = format.into();
        Ok(())
    }

    pub fn set_precision(&mut self, index: usize, precision: usize) -> Result<()> {
        self.column_mut(index)?.precision = precision;
        Ok(())
    }

    /// Visible columns in logical order, frozen and normal interleaved
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    /// Logical indices of the visible columns of one pane, in visual order
    pub fn pane_columns(&self, pane: Pane) -> &[usize] {
        let mapping = self.mapping();
        match pane {
            Pane::Frozen => &mapping.frozen,
            Pane::Normal => &mapping.normal,
        }
    }

    pub fn visible_count(&self) -> usize {
        let mapping = self.mapping();
        mapping.frozen.len() + mapping.normal.len()
    }

    pub fn frozen_visible_count(&self) -> usize {
        self.mapping().frozen.len()
    }

    /// Whether any column lives in the frozen pane
    pub fn has_frozen_column(&self) -> bool {
        self.frozen_visible_count() > 0
    }

    /// Pane-relative visual index of a logical column, `None` when hidden
    pub fn to_visual_index(&self, logical: usize) -> Option<usize> {
        self.mapping().visual.get(logical).copied().flatten()
    }

    /// Logical column at a pane-relative visual index, `None` when unmapped
    pub fn to_logical_index(&self, pane: Pane, visual: usize) -> Option<usize> {
        self.pane_columns(pane).get(visual).copied()
    }

    /// Total width of the visible frozen columns
    pub fn frozen_width(&self) -> u16 {
        self.pane_width(Pane::Frozen)
    }

    pub fn pane_width(&self, pane: Pane) -> u16 {
        self.pane_columns(pane)
            .iter()
            .filter_map(|&i| self.columns.get(i))
            .fold(0u16, |acc, c| acc.saturating_add(c.width))
    }
}
