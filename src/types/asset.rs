use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed asset vocabulary. Anything unrecognised is `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetType {
    Generic,
    Level,
    Package,
    PluginManifest,
    Material,
    Texture,
    Mesh,
    Animation,
    Sound,
    Particle,
    Widget,
    Blueprint,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetType::Generic => "Generic",
            AssetType::Level => "Level",
            AssetType::Package => "Package",
            AssetType::PluginManifest => "PluginManifest",
            AssetType::Material => "Material",
            AssetType::Texture => "Texture",
            AssetType::Mesh => "Mesh",
            AssetType::Animation => "Animation",
            AssetType::Sound => "Sound",
            AssetType::Particle => "Particle",
            AssetType::Widget => "Widget",
            AssetType::Blueprint => "Blueprint",
        };
        f.write_str(name)
    }
}

/// A cataloged content file. Only the file name, location and size are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntity {
    pub name: String,
    /// Path relative to the content root, `/`-separated.
    pub path: String,
    pub asset_type: AssetType,
    pub size: u64,
    /// Reserved for a deep-inspection pass; always empty here.
    pub dependencies: Vec<String>,
    pub referencers: Vec<String>,
}

impl AssetEntity {
    pub fn new(name: String, path: String, asset_type: AssetType, size: u64) -> Self {
        Self {
            name,
            path,
            asset_type,
            size,
            dependencies: Vec::new(),
            referencers: Vec::new(),
        }
    }
}
