use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::data::cell_format::CHECK_GLYPH;
use crate::utils::app_paths::AppPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    pub display: DisplayConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Hide the column header of both panes
    pub header_hidden: bool,

    /// Background of odd rows: a color name or "#rrggbb"; empty disables
    pub alternating_row_color: String,

    /// Show item check boxes in the leading column
    pub check_boxes: bool,

    /// Let the last column take up the remaining width
    pub last_column_stretched: bool,

    /// Glyph rendered for boolean `true` cells
    pub check_glyph: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            header_hidden: false,
            alternating_row_color: "dark gray".to_string(),
            check_boxes: false,
            last_column_stretched: false,
            check_glyph: CHECK_GLYPH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub multi_selection: bool,

    /// Delay (ms) before current-item/selection notifications; 0 publishes at once
    pub item_state_changed_delay_ms: u64,

    /// Allow reordering columns by dragging headers
    pub columns_orderable: bool,

    /// Allow resizing columns from the header
    pub columns_sizable: bool,

    /// Sort by clicking a column header
    pub sortable_by_header_click: bool,

    /// Save the column layout on exit and restore it on start
    pub persistent: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            multi_selection: false,
            item_state_changed_delay_ms: 0,
            columns_orderable: true,
            columns_sizable: true,
            sortable_by_header_click: true,
            persistent: false,
        }
    }
}

/// Resolved, typed options a table is created with
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub header_hidden: bool,
    pub alternating_row_color: Option<Color>,
    pub check_boxes: bool,
    pub last_column_stretched: bool,
    pub check_glyph: String,
    pub multi_selection: bool,
    pub item_state_changed_delay_ms: u64,
    pub columns_orderable: bool,
    pub columns_sizable: bool,
    pub sortable_by_header_click: bool,
    pub persistent: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

impl TableOptions {
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            header_hidden: config.display.header_hidden,
            alternating_row_color: parse_color(&config.display.alternating_row_color),
            check_boxes: config.display.check_boxes,
            last_column_stretched: config.display.last_column_stretched,
            check_glyph: config.display.check_glyph.clone(),
            multi_selection: config.behavior.multi_selection,
            item_state_changed_delay_ms: config.behavior.item_state_changed_delay_ms,
            columns_orderable: config.behavior.columns_orderable,
            columns_sizable: config.behavior.columns_sizable,
            sortable_by_header_click: config.behavior.sortable_by_header_click,
            persistent: config.behavior.persistent,
        }
    }
}

/// Parse a color name or hex value; empty or unknown disables the color
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<Color>() {
        Ok(color) => Some(color),
        Err(_) => {
            warn!(target: "table_view", "Unknown color '{}' in config, ignoring", value);
            None
        }
    }
}

impl TableConfig {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: TableConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        AppPaths::config_file().map_err(|e| anyhow::anyhow!("Could not locate config file: {}", e))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r##"# frozen-table configuration
# Location: ~/.config/frozen-table/config.toml (Linux)
#           ~/Library/Application Support/frozen-table/config.toml (macOS)
#           %APPDATA%\frozen-table\config.toml (Windows)

[display]
# Hide the column header row
header_hidden = false

# Background of every second row: a color name ("dark gray", "blue") or "#rrggbb"
# Leave empty to disable
alternating_row_color = "dark gray"

# Show check boxes in the leading column (needs a model that supports checking)
check_boxes = false

# Stretch the last column over the remaining width
last_column_stretched = false

# Glyph shown for boolean true values
check_glyph = "✔"

[behavior]
# Allow selecting several rows
multi_selection = false

# Delay (milliseconds) before current-item and selection changes are reported
# Useful for master/detail views navigated with arrow keys
item_state_changed_delay_ms = 0

# Allow reordering and resizing columns
columns_orderable = true
columns_sizable = true

# Sort by clicking a column header
sortable_by_header_click = true

# Save the column layout (order, widths, frozen columns, sort) between runs
persistent = false
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert!(config.behavior.sortable_by_header_click);
        assert_eq!(config.behavior.item_state_changed_delay_ms, 0);
        assert_eq!(config.display.check_glyph, "✔");
    }

    #[test]
    fn test_commented_default_parses_to_defaults() {
        let parsed: TableConfig =
            toml::from_str(&TableConfig::create_default_with_comments()).unwrap();
        assert_eq!(parsed, TableConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let parsed: TableConfig = toml::from_str(
            "[behavior]\nmulti_selection = true\nitem_state_changed_delay_ms = 250\n",
        )
        .unwrap();
        assert!(parsed.behavior.multi_selection);
        assert_eq!(parsed.behavior.item_state_changed_delay_ms, 250);
        assert!(parsed.behavior.columns_sizable);
        assert!(!parsed.display.header_hidden);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = TableConfig::default();
        config.display.check_boxes = true;
        config.save_to(&path).unwrap();

        assert_eq!(TableConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_options_resolve_colors() {
        let mut config = TableConfig::default();
        config.display.alternating_row_color = "#102030".to_string();
        let options = TableOptions::from_config(&config);
        assert_eq!(options.alternating_row_color, Some(Color::Rgb(16, 32, 48)));

        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("not-a-color"), None);
    }
}
