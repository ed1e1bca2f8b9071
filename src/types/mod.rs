pub mod asset;
pub mod declaration;
pub mod plugin;
pub mod project;

pub use asset::{AssetEntity, AssetType};
pub use declaration::{CallableEntity, DeclarationEntity, DeclarationKind, EnumValue, Parameter};
pub use plugin::PluginEntity;
pub use project::{BuildConfiguration, BuildType, ModuleRef, PluginRef, ProjectDescriptor};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity families known to the index and to the live delegate seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Declaration,
    Callable,
    Asset,
    Plugin,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Declaration => "declaration",
            EntityKind::Callable => "callable",
            EntityKind::Asset => "asset",
            EntityKind::Plugin => "plugin",
        };
        f.write_str(name)
    }
}
