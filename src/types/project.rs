use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Build flavours crossed with every target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    Development,
    Shipping,
}

impl BuildType {
    pub const ALL: [BuildType; 3] = [BuildType::Debug, BuildType::Development, BuildType::Shipping];
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildType::Debug => "Debug",
            BuildType::Development => "Development",
            BuildType::Shipping => "Shipping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub platform: String,
    pub build_type: BuildType,
}

impl BuildConfiguration {
    /// Platform × build-type cross product, platforms in manifest order.
    pub fn matrix(platforms: &[String]) -> Vec<BuildConfiguration> {
        platforms
            .iter()
            .flat_map(|platform| {
                BuildType::ALL.iter().map(move |build_type| BuildConfiguration {
                    platform: platform.clone(),
                    build_type: *build_type,
                })
            })
            .collect()
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.platform, self.build_type)
    }
}

/// A code module declared by the project manifest or by a plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub name: String,
    pub module_type: String,
    pub loading_phase: String,
    pub dependencies: Vec<String>,
    pub source_path: PathBuf,
    /// Declaration names that won the merge for this module.
    pub declarations: BTreeSet<String>,
}

impl ModuleRef {
    pub fn new(name: String, source_path: PathBuf) -> Self {
        Self {
            name,
            module_type: "Runtime".to_string(),
            loading_phase: "Default".to_string(),
            dependencies: Vec::new(),
            source_path,
            declarations: BTreeSet::new(),
        }
    }

    pub fn with_type(mut self, module_type: String) -> Self {
        self.module_type = module_type;
        self
    }

    pub fn with_loading_phase(mut self, loading_phase: String) -> Self {
        self.loading_phase = loading_phase;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// A plugin entry listed by the project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub name: String,
    pub enabled: bool,
    pub marketplace_url: Option<String>,
}

/// Everything the project manifest says, plus the derived build matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub root: PathBuf,
    pub name: String,
    pub manifest_path: PathBuf,
    pub engine_association: String,
    pub category: String,
    pub description: String,
    pub modules: Vec<ModuleRef>,
    pub plugins: Vec<PluginRef>,
    pub target_platforms: Vec<String>,
    pub build_configurations: Vec<BuildConfiguration>,
}

impl ProjectDescriptor {
    pub fn module(&self, name: &str) -> Option<&ModuleRef> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn plugin_ref(&self, name: &str) -> Option<&PluginRef> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn source_root(&self) -> PathBuf {
        self.root.join("Source")
    }

    pub fn content_root(&self) -> PathBuf {
        self.root.join("Content")
    }

    pub fn plugins_root(&self) -> PathBuf {
        self.root.join("Plugins")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_matrix_is_platform_major() {
        let platforms = vec!["Win64".to_string(), "Linux".to_string()];
        let matrix = BuildConfiguration::matrix(&platforms);

        assert_eq!(matrix.len(), 6);
        assert_eq!(matrix[0].label(), "Win64 Debug");
        assert_eq!(matrix[2].label(), "Win64 Shipping");
        assert_eq!(matrix[3].label(), "Linux Debug");
    }

    #[test]
    fn test_build_matrix_empty_platforms() {
        assert!(BuildConfiguration::matrix(&[]).is_empty());
    }

    #[test]
    fn test_module_ref_defaults() {
        let module = ModuleRef::new("Game".to_string(), PathBuf::from("/p/Source/Game"));
        assert_eq!(module.module_type, "Runtime");
        assert_eq!(module.loading_phase, "Default");
        assert!(module.dependencies.is_empty());
        assert!(module.declarations.is_empty());
    }
}
