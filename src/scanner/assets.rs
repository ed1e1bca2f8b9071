use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::discovery::{has_extension, TreeWalker, WalkedFile};
use crate::error::{ScanDiagnostics, ScanIssue};
use crate::types::{AssetEntity, AssetType};

const DIRECTORY_CONVENTIONS: &[(&[&str], AssetType)] = &[
    (&["materials"], AssetType::Material),
    (&["textures"], AssetType::Texture),
    (&["meshes", "staticmeshes", "skeletalmeshes"], AssetType::Mesh),
    (&["animations", "anims"], AssetType::Animation),
    (&["audio", "sounds", "sound"], AssetType::Sound),
    (&["particles", "effects", "fx", "niagara"], AssetType::Particle),
    (&["ui", "widgets", "hud"], AssetType::Widget),
    (&["blueprints"], AssetType::Blueprint),
];

const PREFIX_CONVENTIONS: &[(&str, AssetType)] = &[
    ("ABP_", AssetType::Animation),
    ("WBP_", AssetType::Widget),
    ("MI_", AssetType::Material),
    ("MF_", AssetType::Material),
    ("SM_", AssetType::Mesh),
    ("SK_", AssetType::Mesh),
    ("AM_", AssetType::Animation),
    ("AS_", AssetType::Animation),
    ("SC_", AssetType::Sound),
    ("SW_", AssetType::Sound),
    ("PS_", AssetType::Particle),
    ("NS_", AssetType::Particle),
    ("UI_", AssetType::Widget),
    ("BP_", AssetType::Blueprint),
    ("M_", AssetType::Material),
    ("T_", AssetType::Texture),
    ("A_", AssetType::Animation),
    ("S_", AssetType::Sound),
    ("P_", AssetType::Particle),
    ("W_", AssetType::Widget),
    ("B_", AssetType::Blueprint),
];

fn type_for_extension(extension: &str) -> Option<AssetType> {
    match extension.to_ascii_lowercase().as_str() {
        "umap" => Some(AssetType::Level),
        "upk" => Some(AssetType::Package),
        "uplugin" => Some(AssetType::PluginManifest),
        _ => None,
    }
}

fn type_for_directory(directory: &str) -> Option<AssetType> {
    let lowered = directory.to_ascii_lowercase();
    DIRECTORY_CONVENTIONS
        .iter()
        .find(|(names, _)| names.contains(&lowered.as_str()))
        .map(|(_, asset_type)| *asset_type)
}

fn type_for_prefix(file_name: &str) -> Option<AssetType> {
    PREFIX_CONVENTIONS
        .iter()
        .find(|(prefix, _)| file_name.starts_with(*prefix))
        .map(|(_, asset_type)| *asset_type)
}

/// Classify an asset from its extension and `/`-separated path relative to
/// the content root.
///
/// Priority: extension map, nearest recognised ancestor directory, file name
/// prefix, then `Generic`. Pure: the same inputs always give the same type.
pub fn classify_asset(extension: &str, relative_path: &str) -> AssetType {
    if let Some(asset_type) = type_for_extension(extension) {
        return asset_type;
    }

    let mut segments: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
    let file_name = segments.pop().unwrap_or("");

    segments
        .iter()
        .rev()
        .find_map(|directory| type_for_directory(directory))
        .or_else(|| type_for_prefix(file_name))
        .unwrap_or(AssetType::Generic)
}

/// Assets found under one content root, in walk order.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    pub assets: Vec<AssetEntity>,
    pub diagnostics: ScanDiagnostics,
}

impl AssetCatalog {
    pub fn total_bytes(&self) -> u64 {
        self.assets.iter().map(|asset| asset.size).sum()
    }
}

#[derive(Debug, Clone)]
pub struct AssetCataloger {
    walker: TreeWalker,
    extensions: Vec<String>,
    parallel: bool,
}

impl AssetCataloger {
    pub fn new(walker: TreeWalker, extensions: Vec<String>, parallel: bool) -> Self {
        Self {
            walker,
            extensions,
            parallel,
        }
    }

    /// Catalog every recognised asset under `content_root`. Only the file
    /// metadata is touched; payloads are never opened.
    pub fn catalog(&self, content_root: &Path) -> AssetCatalog {
        let mut catalog = AssetCatalog::default();

        let mut walk = self
            .walker
            .walk(content_root, |path| has_extension(path, &self.extensions));
        let files: Vec<WalkedFile> = walk.by_ref().collect();
        catalog
            .diagnostics
            .record_many(ScanIssue::DirectoryUnreadable, walk.unreadable_entries());

        let outcomes: Vec<Option<AssetEntity>> = if self.parallel {
            files.par_iter().map(catalog_file).collect()
        } else {
            files.iter().map(catalog_file).collect()
        };

        for outcome in outcomes {
            match outcome {
                Some(asset) => catalog.assets.push(asset),
                None => catalog.diagnostics.record(ScanIssue::FileUnreadable),
            }
        }

        debug!(
            "Cataloged {} assets ({} bytes) under {}",
            catalog.assets.len(),
            catalog.total_bytes(),
            content_root.display()
        );
        catalog
    }
}

fn catalog_file(file: &WalkedFile) -> Option<AssetEntity> {
    let size = match fs::metadata(&file.path) {
        Ok(metadata) => metadata.len(),
        Err(err) => {
            debug!("Skipping asset {}: {}", file.path.display(), err);
            return None;
        }
    };

    let relative = file
        .relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let name = file
        .path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = file
        .path
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default();

    let asset_type = classify_asset(&extension, &relative);
    Some(AssetEntity::new(name, relative, asset_type, size))
}
