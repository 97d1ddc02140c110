//! In-memory table model
//!
//! Rows are kept as typed [`CellValue`]s. The model sorts itself, backs item
//! check boxes and reports every mutation as a [`ModelEvent`] for the host
//! to forward to the view.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::data::table_model::{ItemChecker, ModelEvent, SortOrder, Sorter, TableModel};
use crate::data::value::{CellValue, DataType};
use crate::error::ModelError;

#[derive(Debug, Clone, Default)]
pub struct MemoryTableModel {
    headers: Vec<String>,
    types: Vec<DataType>,
    rows: Vec<Vec<CellValue>>,
    /// Check state travels with its row through sorts
    checked: Vec<bool>,
    sorted_column: usize,
    sort_order: SortOrder,
    unsortable: HashSet<usize>,
}

impl MemoryTableModel {
    pub fn new(headers: Vec<String>) -> Self {
        let types = vec![DataType::Null; headers.len()];
        Self {
            headers,
            types,
            ..Default::default()
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Inferred type of a column
    pub fn column_type(&self, col: usize) -> Option<DataType> {
        self.types.get(col).copied()
    }

    pub fn set_column_sortable(&mut self, col: usize, sortable: bool) {
        if sortable {
            self.unsortable.remove(&col);
        } else {
            self.unsortable.insert(col);
        }
    }

    fn normalize(&mut self, mut row: Vec<CellValue>) -> Vec<CellValue> {
        row.resize(self.headers.len(), CellValue::Null);
        for (ty, value) in self.types.iter_mut().zip(&row) {
            *ty = ty.merge(&value.data_type());
        }
        row
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> ModelEvent {
        let row = self.normalize(row);
        let index = self.rows.len();
        self.rows.push(row);
        self.checked.push(false);
        ModelEvent::RowsInserted {
            from: index,
            to: index,
        }
    }

    /// Insert `rows` before `at`; returns `RowsReset` when nothing was inserted
    pub fn insert_rows(&mut self, at: usize, rows: Vec<Vec<CellValue>>) -> ModelEvent {
        let at = at.min(self.rows.len());
        let count = rows.len();
        if count == 0 {
            return ModelEvent::RowsReset;
        }

        let rows: Vec<_> = rows.into_iter().map(|r| self.normalize(r)).collect();
        self.rows.splice(at..at, rows);
        self.checked.splice(at..at, std::iter::repeat(false).take(count));
        ModelEvent::RowsInserted {
            from: at,
            to: at + count - 1,
        }
    }

    /// Remove rows `from..=to`
    pub fn remove_rows(&mut self, from: usize, to: usize) -> Result<ModelEvent, ModelError> {
        if from > to || to >= self.rows.len() {
            return Err(ModelError::new(format!(
                "cannot remove rows {}..={} of {}",
                from,
                to,
                self.rows.len()
            )));
        }
        self.rows.drain(from..=to);
        self.checked.drain(from..=to);
        Ok(ModelEvent::RowsRemoved { from, to })
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) -> Result<ModelEvent, ModelError> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or_else(|| ModelError::new(format!("no cell at ({}, {})", row, col)))?;
        *cell = value;
        Ok(ModelEvent::RowChanged(row))
    }

    pub fn clear(&mut self) -> ModelEvent {
        self.rows.clear();
        self.checked.clear();
        ModelEvent::RowsReset
    }

    /// Checked rows in ascending order
    pub fn checked_rows(&self) -> Vec<usize> {
        self.checked
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| c.then_some(i))
            .collect()
    }
}

impl TableModel for MemoryTableModel {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(CellValue::Null)
    }

    fn as_sorter(&self) -> Option<&dyn Sorter> {
        Some(self)
    }

    fn as_sorter_mut(&mut self) -> Option<&mut dyn Sorter> {
        Some(self)
    }

    fn as_item_checker(&self) -> Option<&dyn ItemChecker> {
        Some(self)
    }

    fn as_item_checker_mut(&mut self) -> Option<&mut dyn ItemChecker> {
        Some(self)
    }
}

impl Sorter for MemoryTableModel {
    fn sort(&mut self, col: usize, order: SortOrder) -> Result<(), ModelError> {
        if !self.column_sortable(col) {
            return Err(ModelError::new(format!("column {} is not sortable", col)));
        }

        let mut paired: Vec<(Vec<CellValue>, bool)> = std::mem::take(&mut self.rows)
            .into_iter()
            .zip(std::mem::take(&mut self.checked))
            .collect();
        // stable, so equal keys keep their relative order
        paired.sort_by(|(a, _), (b, _)| {
            let ordering = a[col].compare(&b[col]);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        (self.rows, self.checked) = paired.into_iter().unzip();

        self.sorted_column = col;
        self.sort_order = order;
        debug!(target: "data_bridge", "sorted {} rows by column {} {:?}", self.rows.len(), col, order);
        Ok(())
    }

    fn sorted_column(&self) -> usize {
        self.sorted_column
    }

    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    fn column_sortable(&self, col: usize) -> bool {
        col < self.headers.len() && !self.unsortable.contains(&col)
    }
}

impl ItemChecker for MemoryTableModel {
    fn checked(&self, row: usize) -> bool {
        self.checked.get(row).copied().unwrap_or(false)
    }

    fn set_checked(&mut self, row: usize, checked: bool) -> Result<(), ModelError> {
        let slot = self
            .checked
            .get_mut(row)
            .ok_or_else(|| ModelError::new(format!("row {} out of range", row)))?;
        *slot = checked;
        Ok(())
    }
}

/// Load a CSV file with a header row. Column types are inferred over all
/// rows first so a column of whole numbers with one decimal stays numeric.
pub fn load_csv(path: &Path) -> Result<MemoryTableModel> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        records.push(record);
    }

    let mut types = vec![DataType::Null; headers.len()];
    for record in &records {
        for (ty, field) in types.iter_mut().zip(record.iter()) {
            *ty = ty.merge(&DataType::infer_from_string(field.trim()));
        }
    }

    let mut model = MemoryTableModel::new(headers);
    for record in &records {
        let row = types
            .iter()
            .enumerate()
            .map(|(i, &ty)| CellValue::from_string(record.get(i).unwrap_or("").trim(), ty))
            .collect();
        model.push_row(row);
    }

    info!(target: "data_bridge",
          "loaded {} rows x {} columns from {}",
          model.row_count(), model.headers.len(), path.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn people() -> MemoryTableModel {
        let mut model = MemoryTableModel::new(vec!["name".into(), "age".into()]);
        model.push_row(vec![CellValue::Text("bob".into()), CellValue::Integer(40)]);
        model.push_row(vec![CellValue::Text("al".into()), CellValue::Null]);
        model.push_row(vec![CellValue::Text("cy".into()), CellValue::Integer(25)]);
        model
    }

    #[test]
    fn test_sort_carries_check_state() {
        let mut model = people();
        model.set_checked(0, true).unwrap();

        model.sort(1, SortOrder::Descending).unwrap();
        assert_eq!(model.value(0, 0), CellValue::Text("bob".into()));
        assert!(model.checked(0));

        model.sort(1, SortOrder::Ascending).unwrap();
        // nulls first
        assert_eq!(model.value(0, 0), CellValue::Text("al".into()));
        assert_eq!(model.checked_rows(), vec![2]);
        assert_eq!((model.sorted_column(), model.sort_order()), (1, SortOrder::Ascending));
    }

    #[test]
    fn test_unsortable_column_is_refused() {
        let mut model = people();
        model.set_column_sortable(0, false);
        assert!(!model.column_sortable(0));
        assert!(model.sort(0, SortOrder::Ascending).is_err());
        assert!(!model.column_sortable(5));
    }

    #[test]
    fn test_mutations_report_events() {
        let mut model = people();
        assert_eq!(
            model.insert_rows(1, vec![vec![CellValue::Text("x".into())]; 2]),
            ModelEvent::RowsInserted { from: 1, to: 2 }
        );
        assert_eq!(model.row_count(), 5);
        assert_eq!(model.value(1, 1), CellValue::Null);

        assert_eq!(
            model.remove_rows(0, 1).unwrap(),
            ModelEvent::RowsRemoved { from: 0, to: 1 }
        );
        assert!(model.remove_rows(2, 9).is_err());
        assert_eq!(
            model.set_value(0, 1, CellValue::Integer(1)).unwrap(),
            ModelEvent::RowChanged(0)
        );
        assert_eq!(model.clear(), ModelEvent::RowsReset);
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_load_csv_infers_types() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,price,when,note").unwrap();
        writeln!(file, "1,10,2024-01-05,first").unwrap();
        writeln!(file, "2,10.25,2024-02-01 10:30:00,").unwrap();
        file.flush().unwrap();

        let model = load_csv(file.path()).unwrap();
        assert_eq!(model.headers(), &["id", "price", "when", "note"]);
        assert_eq!(model.row_count(), 2);
        assert_eq!(model.value(0, 0), CellValue::Integer(1));
        assert!(matches!(model.value(0, 1), CellValue::Decimal(_)));
        assert!(matches!(model.value(1, 2), CellValue::DateTime(_)));
        assert_eq!(model.value(1, 3), CellValue::Null);
        assert_eq!(model.column_type(1), Some(DataType::Float));
    }
}
