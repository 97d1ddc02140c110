//! Sort and column layout persistence
//!
//! A [`PersistedLayout`] identifies columns by name only: logical indices
//! are not stable between sessions, names are.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::column_manager::ColumnRegistry;
use crate::data::table_model::SortOrder;
use crate::error::{NativeError, Result};
use crate::ui::pane::{NativePane, Pane, PanePair};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedLayout {
    pub sort_column_name: String,
    pub sort_order: SortOrder,
    /// Visible columns, frozen pane first; absence means hidden
    pub display_order: Vec<String>,
    pub columns: Vec<ColumnState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnState {
    pub name: String,
    /// Title override; empty keeps the column's own title
    pub title: String,
    pub width: u16,
    pub frozen: bool,
}

impl PersistedLayout {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnState> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Logical indices of the visible columns of one pane, in that pane's
/// native display order
pub fn pane_display_order<P: NativePane>(
    columns: &ColumnRegistry,
    panes: &PanePair<P>,
    pane: Pane,
) -> std::result::Result<Vec<usize>, NativeError> {
    let visual_to_logical = columns.pane_columns(pane);
    if visual_to_logical.is_empty() {
        return Ok(Vec::new());
    }

    let order = panes.get(pane).column_order()?;
    let mut logical: Vec<usize> = order
        .iter()
        .filter_map(|&visual| visual_to_logical.get(visual).copied())
        .collect();

    // a stale order array must not drop columns
    for &index in visual_to_logical {
        if !logical.contains(&index) {
            logical.push(index);
        }
    }
    Ok(logical)
}

/// Frozen-pane columns in display order followed by normal-pane columns
pub fn display_order<P: NativePane>(
    columns: &ColumnRegistry,
    panes: &PanePair<P>,
) -> std::result::Result<Vec<usize>, NativeError> {
    let mut order = pane_display_order(columns, panes, Pane::Frozen)?;
    order.extend(pane_display_order(columns, panes, Pane::Normal)?);
    Ok(order)
}

/// Native order array of one pane that honors `display` (logical indices)
///
/// Columns of the pane missing from `display` are appended in logical order.
pub fn pane_order_array(columns: &ColumnRegistry, pane: Pane, display: &[usize]) -> Vec<usize> {
    let pane_columns = columns.pane_columns(pane);
    let mut order = Vec::with_capacity(pane_columns.len());
    let mut placed = HashSet::with_capacity(pane_columns.len());

    for &logical in display {
        if let Some(visual) = pane_columns.iter().position(|&l| l == logical) {
            if placed.insert(visual) {
                order.push(visual);
            }
        }
    }
    for visual in 0..pane_columns.len() {
        if placed.insert(visual) {
            order.push(visual);
        }
    }
    order
}

/// Push `display` (logical indices) into both panes' order arrays
pub fn apply_display_order<P: NativePane>(
    columns: &ColumnRegistry,
    panes: &mut PanePair<P>,
    display: &[usize],
) -> std::result::Result<(), NativeError> {
    for pane in [Pane::Frozen, Pane::Normal] {
        let order = pane_order_array(columns, pane, display);
        if !order.is_empty() {
            trace!(target: "layout", "{:?} pane order {:?}", pane, order);
            panes.get_mut(pane).set_column_order(&order)?;
        }
    }
    Ok(())
}

/// Capture the current arrangement; `None` for a table without columns
pub fn capture<P: NativePane>(
    columns: &ColumnRegistry,
    panes: &PanePair<P>,
    sort: (usize, SortOrder),
) -> Result<Option<PersistedLayout>> {
    if columns.is_empty() {
        return Ok(None);
    }

    let (sorted_column, sort_order) = sort;
    let sort_column_name = columns
        .get(sorted_column)
        .map(|c| c.name().to_string())
        .unwrap_or_default();

    let display_order = display_order(columns, panes)?
        .into_iter()
        .filter_map(|i| columns.get(i).map(|c| c.name().to_string()))
        .collect();

    let column_states = columns
        .iter()
        .map(|c| ColumnState {
            name: c.name().to_string(),
            title: c.title_override().to_string(),
            width: c.width(),
            frozen: c.frozen(),
        })
        .collect();

    Ok(Some(PersistedLayout {
        sort_column_name,
        sort_order,
        display_order,
        columns: column_states,
    }))
}

/// Apply per-column state from `layout` to the registry.
///
/// Unknown names are ignored. A column is visible afterwards only if it was
/// visible and appears in the display order. Returns the reconciled display
/// order (logical indices): persisted names that are still visible, then
/// visible columns the layout does not mention.
pub fn apply_columns(columns: &mut ColumnRegistry, layout: &PersistedLayout) -> Result<Vec<usize>> {
    let listed: HashSet<&str> = layout.display_order.iter().map(String::as_str).collect();

    for state in &layout.columns {
        let Some(index) = columns.index_of(&state.name) else {
            debug!(target: "layout", "ignoring unknown column '{}'", state.name);
            continue;
        };
        let visible = columns.get(index).is_some_and(|c| c.visible());
        columns.set_title_override(index, state.title.as_str())?;
        columns.set_width(index, state.width)?;
        columns.set_visible(index, visible && listed.contains(state.name.as_str()))?;
        columns.set_frozen(index, state.frozen)?;
    }

    let mut display: Vec<usize> = layout
        .display_order
        .iter()
        .filter_map(|name| columns.index_of(name))
        .filter(|&i| columns.get(i).is_some_and(|c| c.visible()))
        .collect();

    let known: HashSet<&str> = layout
        .display_order
        .iter()
        .chain(layout.columns.iter().map(|c| &c.name))
        .map(String::as_str)
        .collect();
    for (index, column) in columns.iter().enumerate() {
        if column.visible() && !known.contains(column.name()) && !display.contains(&index) {
            debug!(target: "layout", "appending new column '{}'", column.name());
            display.push(index);
        }
    }
    Ok(display)
}

/// The persisted sort column resolved by name
pub fn resolve_sort(columns: &ColumnRegistry, layout: &PersistedLayout) -> Option<(usize, SortOrder)> {
    columns
        .index_of(&layout.sort_column_name)
        .map(|index| (index, layout.sort_order))
}
