//! Plugin registry: one `*.uplugin` per directory directly under `Plugins/`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::manifest::{strip_bom, RawModule};
use crate::error::{ScanDiagnostics, ScanIssue};
use crate::types::PluginEntity;

pub const PLUGIN_MANIFEST_EXTENSION: &str = "uplugin";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPluginManifest {
    #[serde(default = "default_version")]
    version: i64,
    #[serde(default)]
    version_name: Option<String>,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    created_by: String,
    #[serde(rename = "CreatedByURL", default)]
    created_by_url: Option<String>,
    #[serde(rename = "DocsURL", default)]
    docs_url: Option<String>,
    #[serde(rename = "MarketplaceURL", default)]
    marketplace_url: Option<String>,
    #[serde(rename = "SupportURL", default)]
    support_url: Option<String>,
    #[serde(default)]
    engine_version: Option<String>,
    #[serde(default)]
    can_contain_content: bool,
    #[serde(rename = "IsBetaVersion", default)]
    is_beta: bool,
    #[serde(rename = "IsExperimentalVersion", default)]
    is_experimental: bool,
    #[serde(default = "default_true")]
    installed: bool,
    #[serde(default = "default_true")]
    enabled_by_default: bool,
    #[serde(default)]
    modules: Vec<RawModule>,
}

fn default_version() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// Result of scanning the plugin root.
#[derive(Debug, Clone, Default)]
pub struct PluginScan {
    pub plugins: Vec<PluginEntity>,
    pub diagnostics: ScanDiagnostics,
}

#[derive(Debug)]
enum PluginOutcome {
    Found(PluginEntity),
    NoManifest,
    Invalid(String),
}

pub struct PluginScanner;

impl PluginScanner {
    /// Scan each immediate subdirectory of `plugins_root`, in name order.
    pub fn scan(plugins_root: &Path) -> PluginScan {
        let mut scan = PluginScan::default();

        let entries = match fs::read_dir(plugins_root) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("No plugin directory at {}: {}", plugins_root.display(), err);
                return scan;
            }
        };

        let mut directories: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        directories.sort();

        for directory in directories {
            match Self::scan_directory(&directory) {
                PluginOutcome::Found(plugin) => scan.plugins.push(plugin),
                PluginOutcome::NoManifest => {
                    debug!("No plugin manifest in {}", directory.display());
                }
                PluginOutcome::Invalid(reason) => {
                    warn!("Skipping plugin {}: {}", directory.display(), reason);
                    scan.diagnostics.record(ScanIssue::PluginManifestInvalid);
                }
            }
        }

        debug!("Found {} plugins under {}", scan.plugins.len(), plugins_root.display());
        scan
    }

    fn scan_directory(directory: &Path) -> PluginOutcome {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => return PluginOutcome::Invalid(format!("unreadable directory: {}", err)),
        };

        let manifests: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(PLUGIN_MANIFEST_EXTENSION))
                    .unwrap_or(false)
            })
            .collect();

        let manifest_path = match manifests.as_slice() {
            [] => return PluginOutcome::NoManifest,
            [single] => single,
            _ => return PluginOutcome::Invalid(format!("{} manifests", manifests.len())),
        };

        let content = match fs::read_to_string(manifest_path) {
            Ok(content) => content,
            Err(err) => return PluginOutcome::Invalid(format!("unreadable manifest: {}", err)),
        };

        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match parse_plugin_manifest(&name, directory, &content) {
            Ok(plugin) => PluginOutcome::Found(plugin),
            Err(err) => PluginOutcome::Invalid(err.to_string()),
        }
    }
}

/// Build a plugin entity from manifest text. `name` is the directory name and
/// overrides anything the manifest calls itself.
pub fn parse_plugin_manifest(
    name: &str,
    directory: &Path,
    content: &str,
) -> serde_json::Result<PluginEntity> {
    let raw: RawPluginManifest = serde_json::from_str(strip_bom(content))?;

    let mut plugin = PluginEntity::new(name.to_string(), directory.to_path_buf())
        .with_enabled(raw.enabled_by_default);
    if let Some(category) = raw.category.filter(|c| !c.is_empty()) {
        plugin = plugin.with_category(category);
    }
    if let Some(friendly_name) = raw.friendly_name.filter(|f| !f.is_empty()) {
        plugin.friendly_name = friendly_name;
    }
    if let Some(version_name) = raw.version_name {
        plugin.version_name = version_name;
    }
    plugin.version = raw.version;
    plugin.description = raw.description;
    plugin.created_by = raw.created_by;
    plugin.created_by_url = raw.created_by_url;
    plugin.docs_url = raw.docs_url;
    plugin.marketplace_url = raw.marketplace_url;
    plugin.support_url = raw.support_url;
    plugin.engine_version = raw.engine_version;
    plugin.can_contain_content = raw.can_contain_content;
    plugin.is_beta = raw.is_beta;
    plugin.is_experimental = raw.is_experimental;
    plugin.installed = raw.installed;
    plugin.modules = raw
        .modules
        .into_iter()
        .map(|module| module.into_module_ref(directory))
        .collect();

    Ok(plugin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_PLUGIN: &str = r#"{
        "FileVersion": 3,
        "Version": 4,
        "VersionName": "1.3",
        "FriendlyName": "Weather System",
        "Description": "Clouds and rain",
        "Category": "Rendering",
        "CreatedBy": "Someone",
        "CreatedByURL": "https://example.com",
        "MarketplaceURL": "com.epicgames.launcher://ue/marketplace/weather",
        "SupportURL": "https://example.com/support",
        "EngineVersion": "5.3.0",
        "CanContainContent": true,
        "IsBetaVersion": true,
        "Installed": false,
        "Modules": [
            { "Name": "WeatherRuntime", "Type": "Runtime", "LoadingPhase": "PreDefault" }
        ]
    }"#;

    fn write_plugin(root: &Path, dir: &str, file: &str, content: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(file), content).unwrap();
    }

    #[test]
    fn test_parse_full_plugin_manifest() {
        let dir = Path::new("/p/Plugins/Weather");
        let plugin = parse_plugin_manifest("Weather", dir, FULL_PLUGIN).unwrap();

        assert_eq!(plugin.name, "Weather");
        assert_eq!(plugin.friendly_name, "Weather System");
        assert_eq!(plugin.version, 4);
        assert_eq!(plugin.version_name, "1.3");
        assert_eq!(plugin.category, "Rendering");
        assert!(plugin.can_contain_content);
        assert!(plugin.is_beta);
        assert!(!plugin.is_experimental);
        assert!(!plugin.installed);
        assert!(plugin.enabled);
        assert_eq!(plugin.engine_version.as_deref(), Some("5.3.0"));
        assert!(plugin.marketplace_url.is_some());

        assert_eq!(plugin.modules.len(), 1);
        assert_eq!(plugin.modules[0].loading_phase, "PreDefault");
        assert_eq!(plugin.modules[0].source_path, dir.join("Source").join("WeatherRuntime"));
    }

    #[test]
    fn test_minimal_plugin_manifest_defaults() {
        let plugin = parse_plugin_manifest("Tiny", Path::new("/p/Plugins/Tiny"), "{}").unwrap();
        assert_eq!(plugin.friendly_name, "Tiny");
        assert_eq!(plugin.category, "Other");
        assert!(plugin.installed);
        assert!(plugin.enabled);
        assert!(plugin.modules.is_empty());

        let plugin = parse_plugin_manifest(
            "Off",
            Path::new("/p/Plugins/Off"),
            r#"{"EnabledByDefault": false}"#,
        )
        .unwrap();
        assert!(!plugin.enabled);
    }

    #[test]
    fn test_directory_name_is_authoritative() {
        let plugin = parse_plugin_manifest(
            "RenamedDir",
            Path::new("/p/Plugins/RenamedDir"),
            r#"{"FriendlyName": "Original"}"#,
        )
        .unwrap();
        assert_eq!(plugin.name, "RenamedDir");
        assert_eq!(plugin.friendly_name, "Original");
    }

    #[test]
    fn test_scan_skips_malformed_and_missing() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "Good", "Good.uplugin", FULL_PLUGIN);
        write_plugin(dir.path(), "Broken", "Broken.uplugin", "{ nope");
        write_plugin(dir.path(), "Empty", "notes.txt", "nothing here");
        write_plugin(dir.path(), "Twice", "A.uplugin", "{}");
        write_plugin(dir.path(), "Twice", "B.uplugin", "{}");
        fs::write(dir.path().join("stray.uplugin"), "{}").unwrap();

        let scan = PluginScanner::scan(dir.path());
        assert_eq!(scan.plugins.len(), 1);
        assert_eq!(scan.plugins[0].name, "Good");
        assert_eq!(scan.diagnostics.invalid_plugin_manifests, 2);
    }

    #[test]
    fn test_scan_missing_plugin_root() {
        let dir = TempDir::new().unwrap();
        let scan = PluginScanner::scan(&dir.path().join("Plugins"));
        assert!(scan.plugins.is_empty());
        assert_eq!(scan.diagnostics.total(), 0);
    }

    #[test]
    fn test_scan_orders_by_directory_name() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "Zeta", "Zeta.uplugin", "{}");
        write_plugin(dir.path(), "Alpha", "Alpha.uplugin", "{}");

        let scan = PluginScanner::scan(dir.path());
        let names: Vec<_> = scan.plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
