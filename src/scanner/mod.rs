pub mod assets;
pub mod discovery;
pub mod manifest;
pub mod plugins;
pub mod source;

pub use assets::{classify_asset, AssetCatalog, AssetCataloger};
pub use discovery::{has_extension, TreeWalker, Walk, WalkedFile};
pub use manifest::ManifestParser;
pub use plugins::{parse_plugin_manifest, PluginScan, PluginScanner};
pub use source::{classify_source, FileClassification, ModuleClassification, SourceClassifier};
