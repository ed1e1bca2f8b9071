use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanningConfig;
use crate::error::{IndexError, Result};

/// A file yielded by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
}

/// Depth-first file discovery shared by every scanner.
///
/// Directories are recursed into and never yielded. Entries the walker
/// cannot read are skipped and counted; the walk carries on with siblings.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    follow_symlinks: bool,
    max_depth: Option<usize>,
    exclude: GlobSet,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: None,
            exclude: GlobSet::empty(),
        }
    }
}

impl TreeWalker {
    pub fn new(config: &ScanningConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                IndexError::Config(format!("invalid exclude pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        Ok(Self {
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
            exclude,
        })
    }

    /// Lazily walk `root`, yielding files accepted by `admit`.
    pub fn walk<'a, F>(&'a self, root: &Path, admit: F) -> Walk<'a>
    where
        F: Fn(&Path) -> bool + 'a,
    {
        let mut walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let filter_root = root.to_path_buf();
        let exclude = &self.exclude;
        let inner = walker.into_iter().filter_entry(move |entry| {
            !is_excluded(exclude, &filter_root, entry)
        });

        Walk {
            inner: Box::new(inner),
            root: root.to_path_buf(),
            admit: Box::new(admit),
            unreadable: 0,
        }
    }
}

fn is_excluded(exclude: &GlobSet, root: &Path, entry: &DirEntry) -> bool {
    if exclude.is_empty() || entry.depth() == 0 {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    exclude.is_match(relative)
}

/// Iterator returned by [`TreeWalker::walk`].
pub struct Walk<'a> {
    inner: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + 'a>,
    root: PathBuf,
    admit: Box<dyn Fn(&Path) -> bool + 'a>,
    unreadable: usize,
}

impl Walk<'_> {
    /// Directories (or entries) skipped so far because they could not be read.
    pub fn unreadable_entries(&self) -> usize {
        self.unreadable
    }
}

impl Iterator for Walk<'_> {
    type Item = WalkedFile;

    fn next(&mut self) -> Option<WalkedFile> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if !entry.file_type().is_file() || !(self.admit)(entry.path()) {
                        continue;
                    }
                    let relative_path = entry
                        .path()
                        .strip_prefix(&self.root)
                        .unwrap_or(entry.path())
                        .to_path_buf();
                    return Some(WalkedFile {
                        path: entry.path().to_path_buf(),
                        relative_path,
                    });
                }
                Err(err) => {
                    // The root itself missing is a normal "nothing here".
                    if err.depth() > 0 {
                        self.unreadable += 1;
                    }
                    debug!("Skipping unreadable entry under {}: {}", self.root.display(), err);
                }
            }
        }
    }
}

/// Case-insensitive extension check against a configured list.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
