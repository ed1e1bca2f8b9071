//! Static indexer for Unreal-style project trees.
//!
//! A scan reads the `.uproject` manifest, classifies reflection-marked
//! declarations in each module's sources, catalogs files under `Content/`
//! and parses every `.uplugin` under `Plugins/`. The merged result is an
//! in-memory [`ProjectMap`] answering name, hierarchy and usage queries.
//!
//! ```no_run
//! use ueindex::UeIndex;
//!
//! let mut index = UeIndex::builder().parallel(true).build()?;
//! let result = index.scan("/path/to/MyGame")?;
//! println!("{} declarations", result.declarations_found);
//!
//! for name in index.resolve_hierarchy("AMyCharacter")? {
//!     println!("{}", name);
//! }
//! # Ok::<(), ueindex::IndexError>(())
//! ```

pub mod cli;
pub mod cli_types;
pub mod config;
pub mod delegate;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod scanner;
pub mod storage;
pub mod types;

pub use crate::config::IndexConfig;
pub use delegate::{
    DelegateCapabilities, DelegateOutcome, DelegateSlot, LiveDelegate, LiveEntity, MutationReport,
};
pub use error::{IndexError, Result, ScanDiagnostics, ScanIssue};
pub use indexer::{ScanResult, UeIndex, UeIndexBuilder};
pub use storage::{
    CollisionCounts, FuzzyMatch, IndexStatistics, ProjectMap, ProjectMapMetadata, QueryResult,
    UsageEdge, UsageKind,
};
pub use types::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
