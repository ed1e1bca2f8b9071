pub mod memory;

pub use memory::{
    CollisionCounts, FuzzyMatch, IndexStatistics, ProjectMap, ProjectMapMetadata, QueryResult,
    ScanArtifacts, UsageEdge, UsageKind,
};
