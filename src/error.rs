use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Errors that surface to the caller of a scan or a query.
///
/// Only manifest-level failures abort a scan. Everything that goes wrong
/// further down is recorded as a [`ScanIssue`] and skipped.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("No .uproject manifest found in {0}")]
    ManifestNotFound(PathBuf),

    #[error("Ambiguous manifest in {root}: {} candidates", candidates.len())]
    AmbiguousManifest {
        root: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("Malformed manifest {path}: {reason}")]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("Index not built yet, run a scan first")]
    NotScanned,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl From<::config::ConfigError> for IndexError {
    fn from(err: ::config::ConfigError) -> Self {
        IndexError::Config(err.to_string())
    }
}

/// Non-fatal problems absorbed during a best-effort scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanIssue {
    DirectoryUnreadable,
    FileUnreadable,
    FileUnparseable,
    PluginManifestInvalid,
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanIssue::DirectoryUnreadable => "directory unreadable",
            ScanIssue::FileUnreadable => "file unreadable",
            ScanIssue::FileUnparseable => "file unparseable",
            ScanIssue::PluginManifestInvalid => "plugin manifest invalid",
        };
        f.write_str(name)
    }
}

/// Per-scan tally of absorbed issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiagnostics {
    pub unreadable_directories: usize,
    pub unreadable_files: usize,
    pub unparseable_files: usize,
    pub invalid_plugin_manifests: usize,
}

impl ScanDiagnostics {
    pub fn record(&mut self, issue: ScanIssue) {
        self.record_many(issue, 1);
    }

    pub fn record_many(&mut self, issue: ScanIssue, count: usize) {
        match issue {
            ScanIssue::DirectoryUnreadable => self.unreadable_directories += count,
            ScanIssue::FileUnreadable => self.unreadable_files += count,
            ScanIssue::FileUnparseable => self.unparseable_files += count,
            ScanIssue::PluginManifestInvalid => self.invalid_plugin_manifests += count,
        }
    }

    pub fn merge(&mut self, other: &ScanDiagnostics) {
        self.unreadable_directories += other.unreadable_directories;
        self.unreadable_files += other.unreadable_files;
        self.unparseable_files += other.unparseable_files;
        self.invalid_plugin_manifests += other.invalid_plugin_manifests;
    }

    pub fn total(&self) -> usize {
        self.unreadable_directories
            + self.unreadable_files
            + self.unparseable_files
            + self.invalid_plugin_manifests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_record_and_merge() {
        let mut a = ScanDiagnostics::default();
        a.record(ScanIssue::FileUnreadable);
        a.record_many(ScanIssue::DirectoryUnreadable, 2);

        let mut b = ScanDiagnostics::default();
        b.record(ScanIssue::PluginManifestInvalid);
        b.record(ScanIssue::FileUnparseable);

        a.merge(&b);
        assert_eq!(a.unreadable_files, 1);
        assert_eq!(a.unreadable_directories, 2);
        assert_eq!(a.invalid_plugin_manifests, 1);
        assert_eq!(a.unparseable_files, 1);
        assert_eq!(a.total(), 5);
    }

    #[test]
    fn test_error_messages() {
        let err = IndexError::ManifestNotFound(PathBuf::from("/tmp/p"));
        assert!(err.to_string().contains("/tmp/p"));

        let err = IndexError::AmbiguousManifest {
            root: PathBuf::from("/tmp/p"),
            candidates: vec![PathBuf::from("a.uproject"), PathBuf::from("b.uproject")],
        };
        assert!(err.to_string().contains("2 candidates"));
    }
}
