//! Project manifest (`*.uproject`) discovery and projection.
//!
//! This is the only fatal stage of a scan: without a module list nothing
//! downstream can be located.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{IndexError, Result};
use crate::types::{BuildConfiguration, ModuleRef, PluginRef, ProjectDescriptor};

pub const PROJECT_MANIFEST_EXTENSION: &str = "uproject";
pub const DEFAULT_TARGET_PLATFORM: &str = "Win64";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProjectManifest {
    #[serde(default)]
    engine_association: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    modules: Vec<RawModule>,
    #[serde(default)]
    plugins: Vec<RawPluginRef>,
    #[serde(default)]
    target_platforms: Option<Vec<String>>,
}

/// Module shape shared by project and plugin manifests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawModule {
    name: String,
    #[serde(rename = "Type", default = "default_module_type")]
    module_type: String,
    #[serde(default = "default_loading_phase")]
    loading_phase: String,
    #[serde(default)]
    additional_dependencies: Vec<String>,
}

impl RawModule {
    /// Resolve against the directory that holds the module's `Source` folder.
    pub(crate) fn into_module_ref(self, owner_root: &Path) -> ModuleRef {
        let source_path = owner_root.join("Source").join(&self.name);
        ModuleRef::new(self.name, source_path)
            .with_type(self.module_type)
            .with_loading_phase(self.loading_phase)
            .with_dependencies(self.additional_dependencies)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPluginRef {
    name: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(rename = "MarketplaceURL", default)]
    marketplace_url: Option<String>,
}

fn default_module_type() -> String {
    "Runtime".to_string()
}

fn default_loading_phase() -> String {
    "Default".to_string()
}

fn default_true() -> bool {
    true
}

/// Some editors save JSON manifests with a UTF-8 byte-order mark.
pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

pub struct ManifestParser;

impl ManifestParser {
    /// Locate, read and project the project manifest under `root`.
    pub fn parse(root: &Path) -> Result<ProjectDescriptor> {
        let manifest_path = Self::locate(root)?;
        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            IndexError::ManifestMalformed {
                path: manifest_path.clone(),
                reason: format!("unreadable: {}", e),
            }
        })?;
        let descriptor = Self::parse_str(root, &manifest_path, &content)?;
        info!(
            "Loaded manifest {} ({} modules, {} plugins, {} platforms)",
            manifest_path.display(),
            descriptor.modules.len(),
            descriptor.plugins.len(),
            descriptor.target_platforms.len()
        );
        Ok(descriptor)
    }

    /// Find exactly one `*.uproject` directly inside `root`.
    pub fn locate(root: &Path) -> Result<PathBuf> {
        let entries =
            fs::read_dir(root).map_err(|_| IndexError::ManifestNotFound(root.to_path_buf()))?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(PROJECT_MANIFEST_EXTENSION))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => Err(IndexError::ManifestNotFound(root.to_path_buf())),
            1 => Ok(candidates.remove(0)),
            _ => Err(IndexError::AmbiguousManifest {
                root: root.to_path_buf(),
                candidates,
            }),
        }
    }

    /// Project manifest text into a descriptor. The name comes from the file stem.
    pub fn parse_str(root: &Path, manifest_path: &Path, content: &str) -> Result<ProjectDescriptor> {
        let raw: RawProjectManifest =
            serde_json::from_str(strip_bom(content)).map_err(|e| IndexError::ManifestMalformed {
                path: manifest_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let name = manifest_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();

        let modules: Vec<ModuleRef> = raw
            .modules
            .into_iter()
            .map(|module| module.into_module_ref(root))
            .collect();

        let plugins = raw
            .plugins
            .into_iter()
            .map(|plugin| PluginRef {
                name: plugin.name,
                enabled: plugin.enabled,
                marketplace_url: plugin.marketplace_url,
            })
            .collect();

        let target_platforms = match raw.target_platforms {
            Some(platforms) if !platforms.is_empty() => platforms,
            _ => vec![DEFAULT_TARGET_PLATFORM.to_string()],
        };
        let build_configurations = BuildConfiguration::matrix(&target_platforms);
        debug!("Derived {} build configurations", build_configurations.len());

        Ok(ProjectDescriptor {
            root: root.to_path_buf(),
            name,
            manifest_path: manifest_path.to_path_buf(),
            engine_association: raw.engine_association.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            modules,
            plugins,
            target_platforms,
            build_configurations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_MANIFEST: &str = r#"{
        "FileVersion": 3,
        "EngineAssociation": "5.3",
        "Category": "Games",
        "Description": "A test project",
        "Modules": [
            {
                "Name": "ShooterGame",
                "Type": "Runtime",
                "LoadingPhase": "Default",
                "AdditionalDependencies": ["Engine", "CoreUObject"]
            },
            { "Name": "ShooterEditor", "Type": "Editor", "LoadingPhase": "PostEngineInit" }
        ],
        "Plugins": [
            { "Name": "Niagara", "Enabled": true },
            { "Name": "OldThing", "Enabled": false, "MarketplaceURL": "com.epicgames.launcher://x" }
        ],
        "TargetPlatforms": ["Win64", "Linux"]
    }"#;

    #[test]
    fn test_parse_full_manifest() {
        let root = Path::new("/projects/Shooter");
        let path = root.join("Shooter.uproject");
        let project = ManifestParser::parse_str(root, &path, FULL_MANIFEST).unwrap();

        assert_eq!(project.name, "Shooter");
        assert_eq!(project.engine_association, "5.3");
        assert_eq!(project.category, "Games");
        assert_eq!(project.modules.len(), 2);

        let game = &project.modules[0];
        assert_eq!(game.name, "ShooterGame");
        assert_eq!(game.dependencies, vec!["Engine", "CoreUObject"]);
        assert_eq!(game.source_path, root.join("Source").join("ShooterGame"));

        let editor = &project.modules[1];
        assert_eq!(editor.module_type, "Editor");
        assert_eq!(editor.loading_phase, "PostEngineInit");

        assert_eq!(project.plugins.len(), 2);
        assert!(!project.plugins[1].enabled);
        assert!(project.plugins[1].marketplace_url.is_some());

        assert_eq!(project.target_platforms, vec!["Win64", "Linux"]);
        assert_eq!(project.build_configurations.len(), 6);
    }

    #[test]
    fn test_missing_arrays_are_empty() {
        let root = Path::new("/p");
        let project =
            ManifestParser::parse_str(root, &root.join("Bare.uproject"), r#"{"FileVersion": 3}"#)
                .unwrap();

        assert!(project.modules.is_empty());
        assert!(project.plugins.is_empty());
        assert_eq!(project.target_platforms, vec![DEFAULT_TARGET_PLATFORM]);
        assert_eq!(project.build_configurations.len(), 3);
        assert_eq!(project.engine_association, "");
    }

    #[test]
    fn test_module_defaults() {
        let root = Path::new("/p");
        let project = ManifestParser::parse_str(
            root,
            &root.join("P.uproject"),
            r#"{"Modules": [{"Name": "Core"}]}"#,
        )
        .unwrap();
        assert_eq!(project.modules[0].module_type, "Runtime");
        assert_eq!(project.modules[0].loading_phase, "Default");
    }

    #[test]
    fn test_malformed_manifest() {
        let root = Path::new("/p");
        let path = root.join("P.uproject");

        for bad in [
            "{ not json",
            "42",
            r#"{"Modules": "Core"}"#,
            r#"{"Modules": [{"Type": "Runtime"}]}"#,
        ] {
            let err = ManifestParser::parse_str(root, &path, bad).unwrap_err();
            assert!(matches!(err, IndexError::ManifestMalformed { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_bom_is_tolerated() {
        let root = Path::new("/p");
        let content = format!("\u{feff}{}", r#"{"EngineAssociation": "5.1"}"#);
        let project = ManifestParser::parse_str(root, &root.join("P.uproject"), &content).unwrap();
        assert_eq!(project.engine_association, "5.1");
    }

    #[test]
    fn test_locate_single_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Game.uproject"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("Nested")).unwrap();
        std::fs::write(dir.path().join("Nested").join("Other.uproject"), "{}").unwrap();

        let path = ManifestParser::locate(dir.path()).unwrap();
        assert!(path.ends_with("Game.uproject"));
    }

    #[test]
    fn test_locate_missing_and_ambiguous() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ManifestParser::locate(dir.path()),
            Err(IndexError::ManifestNotFound(_))
        ));

        std::fs::write(dir.path().join("A.uproject"), "{}").unwrap();
        std::fs::write(dir.path().join("B.uproject"), "{}").unwrap();
        match ManifestParser::locate(dir.path()) {
            Err(IndexError::AmbiguousManifest { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous manifest, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_nonexistent_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(
            ManifestParser::parse(&missing),
            Err(IndexError::ManifestNotFound(_))
        ));
    }
}
