//! Engine configuration.
//!
//! Loaded from TOML; every field is optional and falls back to the built-in
//! default:
//!
//! ```toml
//! default_row_height = 25
//! default_col_width = 120
//! row_count = 100
//! col_count = 26
//! buffer = 5
//! max_range_cells = 1000000
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use cellgrid_engine::engine::MAX_DEPENDENCY_RANGE_CELLS;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Row height in pixels when no override is set.
    pub default_row_height: f64,
    /// Column width in pixels when no override is set.
    pub default_col_width: f64,
    pub row_count: usize,
    pub col_count: usize,
    /// Extra rows/columns materialized past each viewport edge.
    pub buffer: usize,
    /// Ranges larger than this are not expanded into dependency edges.
    pub max_range_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_row_height: 25.0,
            default_col_width: 120.0,
            row_count: 100,
            col_count: 26,
            buffer: 5,
            max_range_cells: MAX_DEPENDENCY_RANGE_CELLS,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// `<config dir>/cellgrid/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cellgrid").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the file at [`EngineConfig::default_path`] if it exists, otherwise defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
