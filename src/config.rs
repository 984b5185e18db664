//! JSON configuration for map generation.

use crate::boundaries::{DEFAULT_KEY_COLUMN, DEFAULT_SHAPEFILE};
use crate::maps::DEFAULT_FIGURE_HEIGHT;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for map generation.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "shapefile": "maps/NY/NY-zipcodes.shp",
///   "key_column": "ZCTA5CE20",
///   "output_dir": "figures",
///   "figure_height": 400
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub shapefile: PathBuf,
    pub key_column: String,
    pub output_dir: PathBuf,
    pub figure_height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            shapefile: PathBuf::from(DEFAULT_SHAPEFILE),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            output_dir: PathBuf::from("figures"),
            figure_height: DEFAULT_FIGURE_HEIGHT,
        }
    }
}

impl MapConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.shapefile, PathBuf::from("maps/NY/NY-zipcodes.shp"));
        assert_eq!(config.key_column, "ZCTA5CE20");
        assert_eq!(config.figure_height, 400);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MapConfig::from_json(r#"{"figure_height": 600}"#).unwrap();
        assert_eq!(config.figure_height, 600);
        assert_eq!(config.key_column, "ZCTA5CE20");
        assert_eq!(config.output_dir, PathBuf::from("figures"));
    }

    #[test]
    fn test_full_json() {
        let config = MapConfig::from_json(
            r#"{"shapefile": "maps/NJ/zips.shp", "key_column": "ZCTA5CE10", "output_dir": "out", "figure_height": 500}"#,
        )
        .unwrap();
        assert_eq!(config.shapefile, PathBuf::from("maps/NJ/zips.shp"));
        assert_eq!(config.key_column, "ZCTA5CE10");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(MapConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(MapConfig::load(Path::new("/nonexistent/config.json")).is_err());
        assert!(MapConfig::load_or_default(None).is_ok());
    }
}
