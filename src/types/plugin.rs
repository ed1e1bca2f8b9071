use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::project::ModuleRef;

/// A plugin found under the plugin root. `name` is the directory name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntity {
    pub name: String,
    pub friendly_name: String,
    pub version: i64,
    pub version_name: String,
    pub description: String,
    pub category: String,
    pub created_by: String,
    pub created_by_url: Option<String>,
    pub docs_url: Option<String>,
    pub marketplace_url: Option<String>,
    pub support_url: Option<String>,
    pub engine_version: Option<String>,
    pub can_contain_content: bool,
    pub is_beta: bool,
    pub is_experimental: bool,
    pub installed: bool,
    pub enabled: bool,
    pub modules: Vec<ModuleRef>,
    pub path: PathBuf,
}

impl PluginEntity {
    pub fn new(name: String, path: PathBuf) -> Self {
        Self {
            friendly_name: name.clone(),
            name,
            version: 1,
            version_name: "1.0".to_string(),
            description: String::new(),
            category: "Other".to_string(),
            created_by: String::new(),
            created_by_url: None,
            docs_url: None,
            marketplace_url: None,
            support_url: None,
            engine_version: None,
            can_contain_content: false,
            is_beta: false,
            is_experimental: false,
            installed: true,
            enabled: true,
            modules: Vec::new(),
            path,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
