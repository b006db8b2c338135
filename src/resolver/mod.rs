//! Maps request paths to files under the served folder.
//!
//! The mapping is cached in a [`FileIndex`]. Lookups never touch the
//! filesystem on a hit, so a deleted file stays in the index until the next
//! rebuild. A miss may trigger a rebuild, but at most once per cache
//! interval so that requests for files that do not exist cannot keep the
//! server busy walking the tree.

mod file_index;
pub mod mime;

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use file_index::FileIndex;

pub const DEFAULT_CACHE_INTERVAL: Duration = Duration::from_millis(5000);

pub struct FileResolver {
    root: PathBuf,
    index: FileIndex,
    refreshed_at: Instant,
    cache_interval: Duration,
}

impl FileResolver {
    /// Builds the initial index of `root`.
    pub fn new(root: impl Into<PathBuf>, cache_interval: Duration) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);

        let mut resolver = Self {
            root,
            index: FileIndex::default(),
            refreshed_at: Instant::now(),
            cache_interval,
        };
        resolver.rebuild();
        resolver
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Finds the file for an already normalized request path
    /// (`/dir/` must have become `/dir/index.html`).
    pub fn resolve(&mut self, request_path: &str) -> Option<PathBuf> {
        if let Some(file) = self.index.get(request_path) {
            return Some(file.to_path_buf());
        }

        if self.refreshed_at.elapsed() <= self.cache_interval {
            debug!("{} not indexed, refresh skipped", request_path);
            return None;
        }

        info!("Refreshing file list");
        self.rebuild();
        self.index.get(request_path).map(Path::to_path_buf)
    }

    /// Rescans the root unconditionally and restarts the cache interval.
    pub fn rebuild(&mut self) {
        self.index = FileIndex::scan(&self.root);
        self.refreshed_at = Instant::now();
        debug!("Indexed {} files under {:?}", self.index.len(), self.root);
    }
}
