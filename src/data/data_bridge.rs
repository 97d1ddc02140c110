//! Virtual data bridge
//!
//! Answers every per-cell query of the panes (text, image, check state,
//! style) straight from the model. Nothing is cached except the icon list,
//! which maps image identities to stable slots and is dropped whenever the
//! model is replaced.

use ratatui::style::Color;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::column_manager::ColumnRegistry;
use crate::data::cell_format::{format_cell, CHECK_GLYPH};
use crate::data::table_model::{CellStyle, CellStyler, Image, ItemChecker, SortOrder, TableModel};
use crate::error::ModelError;

/// Icon slots shared by both panes, keyed by image identity
#[derive(Debug, Default)]
pub struct IconCache {
    images: Vec<Image>,
    index_by_image: HashMap<Image, usize>,
}

impl IconCache {
    pub fn index_for(&mut self, image: Image) -> usize {
        if let Some(&index) = self.index_by_image.get(&image) {
            return index;
        }
        let index = self.images.len();
        self.images.push(image.clone());
        self.index_by_image.insert(image, index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&Image> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Where a capability comes from: the model itself or an explicit override
enum Source<T: ?Sized> {
    None,
    Model,
    Custom(Box<T>),
}

impl<T: ?Sized> Source<T> {
    fn is_model(&self) -> bool {
        matches!(self, Source::Model)
    }
}

pub struct DataBridge {
    model: Option<Box<dyn TableModel>>,
    styler: Source<dyn CellStyler>,
    checker: Source<dyn ItemChecker>,
    icons: Option<IconCache>,
    alternating_row_color: Option<Color>,
    check_glyph: String,
}

impl Default for DataBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBridge {
    pub fn new() -> Self {
        Self {
            model: None,
            styler: Source::None,
            checker: Source::None,
            icons: None,
            alternating_row_color: None,
            check_glyph: CHECK_GLYPH.to_string(),
        }
    }

    /// Replace the model, returning the previous one.
    ///
    /// The styler follows the new model when it provides one or when the
    /// current styler was the old model's; an explicit styler otherwise
    /// survives. The item checker always follows the new model.
    pub fn set_model(&mut self, model: Option<Box<dyn TableModel>>) -> Option<Box<dyn TableModel>> {
        self.icons = None;

        let provides_styler = model.as_ref().is_some_and(|m| m.as_cell_styler().is_some());
        if provides_styler || self.styler.is_model() {
            self.styler = if provides_styler {
                Source::Model
            } else {
                Source::None
            };
        }

        self.checker = if model.as_ref().is_some_and(|m| m.as_item_checker().is_some()) {
            Source::Model
        } else {
            Source::None
        };

        debug!(target: "data_bridge",
               "model replaced: rows={} styler={} checker={}",
               model.as_ref().map_or(0, |m| m.row_count()),
               !matches!(self.styler, Source::None),
               self.has_item_checker());

        std::mem::replace(&mut self.model, model)
    }

    pub fn model(&self) -> Option<&dyn TableModel> {
        self.model.as_deref()
    }

    pub fn model_mut(&mut self) -> Option<&mut (dyn TableModel + 'static)> {
        self.model.as_deref_mut()
    }

    pub fn set_cell_styler(&mut self, styler: Option<Box<dyn CellStyler>>) {
        self.styler = match styler {
            Some(s) => Source::Custom(s),
            None => Source::None,
        };
    }

    pub fn set_item_checker(&mut self, checker: Option<Box<dyn ItemChecker>>) {
        self.checker = match checker {
            Some(c) => Source::Custom(c),
            None => Source::None,
        };
    }

    pub fn set_alternating_row_color(&mut self, color: Option<Color>) {
        self.alternating_row_color = color;
    }

    pub fn alternating_row_color(&self) -> Option<Color> {
        self.alternating_row_color
    }

    pub fn set_check_glyph(&mut self, glyph: impl Into<String>) {
        self.check_glyph = glyph.into();
    }

    pub fn row_count(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.row_count())
    }

    fn styler(&self) -> Option<&dyn CellStyler> {
        match &self.styler {
            Source::None => None,
            Source::Model => self.model.as_ref().and_then(|m| m.as_cell_styler()),
            Source::Custom(s) => Some(s.as_ref()),
        }
    }

    fn checker(&self) -> Option<&dyn ItemChecker> {
        match &self.checker {
            Source::None => None,
            Source::Model => self.model.as_ref().and_then(|m| m.as_item_checker()),
            Source::Custom(c) => Some(c.as_ref()),
        }
    }

    pub fn has_item_checker(&self) -> bool {
        self.checker().is_some()
    }

    /// Display text of a cell
    pub fn cell_text(&self, columns: &ColumnRegistry, row: usize, col: usize) -> String {
        let (Some(model), Some(column)) = (self.model.as_ref(), columns.get(col)) else {
            return String::new();
        };
        if row >= model.row_count() {
            return String::new();
        }
        format_cell(&model.value(row, col), column, &self.check_glyph)
    }

    /// Icon slot for a cell. The image provider only answers for the leading
    /// column; the styler's image is the fallback for every cell.
    pub fn cell_image(&mut self, row: usize, col: usize, leading: bool) -> Option<usize> {
        let mut image = None;

        if leading {
            image = self
                .model
                .as_ref()
                .and_then(|m| m.as_image_provider())
                .and_then(|p| p.image(row));
        }

        if image.is_none() {
            if let Some(styler) = self.styler() {
                let mut style = CellStyle::new(row, Some(col));
                styler.style_cell(&mut style);
                image = style.image;
            }
        }

        let image = image?;
        let icons = self.icons.get_or_insert_with(|| {
            debug!(target: "data_bridge", "creating icon cache");
            IconCache::default()
        });
        Some(icons.index_for(image))
    }

    pub fn icon(&self, index: usize) -> Option<&Image> {
        self.icons.as_ref().and_then(|icons| icons.get(index))
    }

    pub fn icon_cache(&self) -> Option<&IconCache> {
        self.icons.as_ref()
    }

    /// Check state of a row, `None` without an item checker
    pub fn checked(&self, row: usize) -> Option<bool> {
        self.checker().map(|c| c.checked(row))
    }

    /// Flip the check state of a row through the item checker
    pub fn toggle_checked(&mut self, row: usize) -> Result<bool, ModelError> {
        let checker: &mut dyn ItemChecker = match &mut self.checker {
            Source::None => return Err(ModelError::new("no item checker")),
            Source::Custom(c) => c.as_mut(),
            Source::Model => self
                .model
                .as_mut()
                .and_then(|m| m.as_item_checker_mut())
                .ok_or_else(|| ModelError::new("model has no item checker"))?,
        };
        let checked = !checker.checked(row);
        checker.set_checked(row, checked)?;
        Ok(checked)
    }

    fn baseline_style(&self, row: usize, col: Option<usize>) -> CellStyle {
        let mut style = CellStyle::new(row, col);
        if row % 2 == 1 {
            style.background = self.alternating_row_color;
        }
        style
    }

    /// Row-level style (styler called with no column)
    pub fn row_style(&self, row: usize) -> CellStyle {
        let mut style = self.baseline_style(row, None);
        if let Some(styler) = self.styler() {
            styler.style_cell(&mut style);
        }
        style
    }

    pub fn cell_style(&self, row: usize, col: usize) -> CellStyle {
        let mut style = self.baseline_style(row, Some(col));
        if let Some(styler) = self.styler() {
            styler.style_cell(&mut style);
        }
        style
    }

    /// Let a lazily-populated model load rows `from..=to` before painting
    pub fn prepare_rows(&mut self, from: usize, to: usize) {
        if let Some(populator) = self.model.as_mut().and_then(|m| m.as_populator_mut()) {
            if let Err(e) = populator.populate(from, to) {
                warn!(target: "data_bridge", "populate {}..={} failed: {}", from, to, e);
            }
        }
    }

    pub fn is_sortable(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.as_sorter().is_some())
    }

    pub fn column_sortable(&self, col: usize) -> bool {
        self.model
            .as_ref()
            .and_then(|m| m.as_sorter())
            .is_some_and(|s| s.column_sortable(col))
    }

    /// Current sort of a self-sorting model
    pub fn model_sort(&self) -> Option<(usize, SortOrder)> {
        self.model
            .as_ref()
            .and_then(|m| m.as_sorter())
            .map(|s| (s.sorted_column(), s.sort_order()))
    }

    /// Sort a self-sorting model; `Ok(false)` when the model cannot sort
    pub fn sort(&mut self, col: usize, order: SortOrder) -> Result<bool, ModelError> {
        match self.model.as_mut().and_then(|m| m.as_sorter_mut()) {
            Some(sorter) => {
                sorter.sort(col, order)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_manager::Column;
    use crate::data::table_model::ImageProvider;
    use crate::data::value::CellValue;

    struct IconModel;

    impl TableModel for IconModel {
        fn row_count(&self) -> usize {
            4
        }

        fn value(&self, row: usize, _col: usize) -> CellValue {
            CellValue::Float(row as f64 * 1000.5)
        }

        fn as_image_provider(&self) -> Option<&dyn ImageProvider> {
            Some(self)
        }
    }

    impl ImageProvider for IconModel {
        fn image(&self, row: usize) -> Option<Image> {
            (row % 2 == 0).then(|| Image::Glyph('*'))
        }
    }

    struct RedText;

    impl CellStyler for RedText {
        fn style_cell(&self, style: &mut CellStyle) {
            if style.col() == Some(1) {
                style.text_color = Some(Color::Red);
                style.image = Some(Image::Handle(9));
            }
        }
    }

    fn columns() -> ColumnRegistry {
        ColumnRegistry::with_columns([Column::new("a"), Column::new("b")]).unwrap()
    }

    #[test]
    fn test_text_without_model_is_empty() {
        let bridge = DataBridge::new();
        assert_eq!(bridge.cell_text(&columns(), 0, 0), "");
    }

    #[test]
    fn test_text_is_formatted_per_column() {
        let mut bridge = DataBridge::new();
        bridge.set_model(Some(Box::new(IconModel)));
        assert_eq!(bridge.cell_text(&columns(), 3, 0), "3,001.50");
        assert_eq!(bridge.cell_text(&columns(), 9, 0), "");
        assert_eq!(bridge.cell_text(&columns(), 1, 7), "");
    }

    #[test]
    fn test_images_are_cached_by_identity() {
        let mut bridge = DataBridge::new();
        bridge.set_model(Some(Box::new(IconModel)));
        assert!(bridge.icon_cache().is_none());

        assert_eq!(bridge.cell_image(1, 0, true), None);
        assert!(bridge.icon_cache().is_none());

        assert_eq!(bridge.cell_image(0, 0, true), Some(0));
        assert_eq!(bridge.cell_image(2, 0, true), Some(0));
        assert_eq!(bridge.icon_cache().map(|c| c.len()), Some(1));
        // provider only answers for the leading column
        assert_eq!(bridge.cell_image(0, 0, false), None);

        bridge.set_model(Some(Box::new(IconModel)));
        assert!(bridge.icon_cache().is_none());
    }

    #[test]
    fn test_styler_image_is_fallback() {
        let mut bridge = DataBridge::new();
        bridge.set_model(Some(Box::new(IconModel)));
        bridge.set_cell_styler(Some(Box::new(RedText)));

        assert_eq!(bridge.cell_image(1, 1, false), Some(0));
        assert_eq!(bridge.icon(0), Some(&Image::Handle(9)));
        assert_eq!(bridge.cell_image(0, 0, true), Some(1));
    }

    #[test]
    fn test_alternating_background_is_baseline() {
        let mut bridge = DataBridge::new();
        bridge.set_model(Some(Box::new(IconModel)));
        bridge.set_alternating_row_color(Some(Color::DarkGray));
        bridge.set_cell_styler(Some(Box::new(RedText)));

        assert_eq!(bridge.cell_style(0, 0).background, None);
        let odd = bridge.cell_style(1, 1);
        assert_eq!(odd.background, Some(Color::DarkGray));
        assert_eq!(odd.text_color, Some(Color::Red));
        assert_eq!(bridge.row_style(3).col(), None);
    }

    #[test]
    fn test_custom_styler_survives_plain_model() {
        let mut bridge = DataBridge::new();
        bridge.set_cell_styler(Some(Box::new(RedText)));
        bridge.set_model(Some(Box::new(IconModel)));
        assert_eq!(bridge.cell_style(0, 1).text_color, Some(Color::Red));
    }

    #[test]
    fn test_toggle_without_checker_fails() {
        let mut bridge = DataBridge::new();
        bridge.set_model(Some(Box::new(IconModel)));
        assert!(bridge.checked(0).is_none());
        assert!(bridge.toggle_checked(0).is_err());
    }
}
