//! Indexer configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `UEINDEX__SECTION__KEY` environment overrides.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub scanning: ScanningConfig,
    pub source: SourceConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
    /// Globs matched against paths relative to each walk root.
    pub exclude_patterns: Vec<String>,
    pub parallel: bool,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: None,
            exclude_patterns: vec![
                "**/Intermediate".to_string(),
                "**/Binaries".to_string(),
                "**/Saved".to_string(),
                "**/DerivedDataCache".to_string(),
            ],
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub extensions: Vec<String>,
    pub include_plugin_modules: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "h".to_string(),
                "hpp".to_string(),
                "cpp".to_string(),
                "inl".to_string(),
            ],
            include_plugin_modules: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub extensions: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "uasset".to_string(),
                "umap".to_string(),
                "upk".to_string(),
                "uplugin".to_string(),
            ],
        }
    }
}

impl IndexConfig {
    /// Load defaults, then `path` (if it exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path.to_path_buf()).required(false));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("UEINDEX")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IndexError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `<config dir>/ueindex/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ueindex")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::default();
        assert!(config.scanning.parallel);
        assert!(!config.scanning.follow_symlinks);
        assert!(config.source.extensions.contains(&"h".to_string()));
        assert!(config.assets.extensions.contains(&"uasset".to_string()));
        assert!(config.source.include_plugin_modules);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = IndexConfig::default();
        config.scanning.parallel = false;
        config.scanning.max_depth = Some(4);
        config.source.extensions = vec!["h".to_string()];
        config.save(&path).unwrap();

        let loaded = IndexConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[assets]\nextensions = [\"umap\"]\n").unwrap();

        let loaded = IndexConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.assets.extensions, vec!["umap".to_string()]);
        assert_eq!(loaded.source, SourceConfig::default());
        assert_eq!(loaded.scanning, ScanningConfig::default());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let loaded = IndexConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded, IndexConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanning\nparallel = ").unwrap();

        let err = IndexConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }
}
