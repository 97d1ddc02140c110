//! Table model traits for abstracting data access
//!
//! The widget never holds rows itself. Every cell is resolved on demand from
//! a [`TableModel`]. Optional capabilities (sorting, check boxes, icons,
//! per-cell styling, bulk population) are exposed as trait views on the
//! model; a model that does not implement one simply returns `None`.

use ratatui::style::{Color, Modifier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::value::CellValue;
use crate::error::ModelError;

/// Sort order for columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortOrder::Ascending => " ↑",
            SortOrder::Descending => " ↓",
        }
    }
}

/// Change notifications a model raises; the host forwards them to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    /// Row count changed arbitrarily
    RowsReset,
    /// A single row's content changed
    RowChanged(usize),
    /// Rows `from..=to` were inserted
    RowsInserted { from: usize, to: usize },
    /// Rows `from..=to` were removed
    RowsRemoved { from: usize, to: usize },
    /// The model re-sorted itself
    SortChanged,
}

/// An image a model or styler wants drawn in a cell.
///
/// Equality is identity: two handles with the same id, or two files with the
/// same path, share one slot in the icon cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Image {
    /// An opaque handle owned by the host
    Handle(u64),
    /// An icon loaded from a file path
    File(PathBuf),
    /// A single glyph drawn in place of a bitmap
    Glyph(char),
}

/// Mutable per-cell style context handed to a [`CellStyler`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    row: usize,
    col: Option<usize>,
    pub background: Option<Color>,
    pub text_color: Option<Color>,
    pub font: Modifier,
    pub image: Option<Image>,
    /// Set by stylers that draw the cell themselves
    pub custom_paint: bool,
}

impl CellStyle {
    pub fn new(row: usize, col: Option<usize>) -> Self {
        Self {
            row,
            col,
            ..Default::default()
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Logical column, `None` while styling the whole row
    pub fn col(&self) -> Option<usize> {
        self.col
    }
}

/// Core trait for read-only data access
pub trait TableModel {
    /// Get the total number of rows
    fn row_count(&self) -> usize;

    /// Get the raw value of a cell addressed by logical column
    fn value(&self, row: usize, col: usize) -> CellValue;

    fn as_sorter(&self) -> Option<&dyn Sorter> {
        None
    }

    fn as_sorter_mut(&mut self) -> Option<&mut dyn Sorter> {
        None
    }

    fn as_item_checker(&self) -> Option<&dyn ItemChecker> {
        None
    }

    fn as_item_checker_mut(&mut self) -> Option<&mut dyn ItemChecker> {
        None
    }

    fn as_image_provider(&self) -> Option<&dyn ImageProvider> {
        None
    }

    fn as_cell_styler(&self) -> Option<&dyn CellStyler> {
        None
    }

    fn as_populator_mut(&mut self) -> Option<&mut dyn Populator> {
        None
    }
}

/// Models that can sort themselves
pub trait Sorter {
    fn sort(&mut self, col: usize, order: SortOrder) -> Result<(), ModelError>;

    fn sorted_column(&self) -> usize;

    fn sort_order(&self) -> SortOrder;

    fn column_sortable(&self, col: usize) -> bool;
}

/// Models backing item check boxes
pub trait ItemChecker {
    fn checked(&self, row: usize) -> bool;

    fn set_checked(&mut self, row: usize, checked: bool) -> Result<(), ModelError>;
}

/// Models providing a per-row image for the first column
pub trait ImageProvider {
    fn image(&self, row: usize) -> Option<Image>;
}

/// Per-cell background, text color, font and image
pub trait CellStyler {
    fn style_cell(&self, style: &mut CellStyle);
}

/// Models that load rows lazily; called before a row range is painted
pub trait Populator {
    fn populate(&mut self, from: usize, to: usize) -> Result<(), ModelError>;
}
