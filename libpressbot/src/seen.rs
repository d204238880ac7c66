//! Durable record of posts already evaluated
//!
//! The seen set remembers every post identifier the scanner has looked at, so a
//! later run neither reclassifies nor reposts it. The set keeps insertion order
//! so that eviction can drop the oldest identifiers first once the set grows
//! past its high-water mark.
//!
//! On disk the set is a JSON array of identifier strings, oldest first.

use std::collections::{HashSet, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Default size above which the seen set is trimmed
pub const DEFAULT_HIGH_WATER_MARK: usize = 10_000;

/// Default number of oldest entries removed per trim
pub const DEFAULT_EVICT_BATCH_SIZE: usize = 5_000;

/// Insertion-ordered set of post identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Add an identifier, returning `true` if it was not already present
    ///
    /// Re-inserting an existing identifier keeps its original position.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate identifiers from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Drop the `batch_size` oldest entries if the set exceeds `high_water_mark`
    ///
    /// Returns the number of entries removed.
    pub fn evict(&mut self, high_water_mark: usize, batch_size: usize) -> usize {
        if self.order.len() <= high_water_mark {
            return 0;
        }

        let count = batch_size.min(self.order.len());
        for id in self.order.drain(..count) {
            self.members.remove(&id);
        }
        count
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = SeenSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Consume a seen set and return it trimmed per [`SeenSet::evict`]
pub fn evict(mut seen: SeenSet, high_water_mark: usize, batch_size: usize) -> SeenSet {
    seen.evict(high_water_mark, batch_size);
    seen
}

/// File-backed storage for the seen set
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen set from disk
    ///
    /// A missing or unreadable file yields an empty set; this never fails.
    pub fn load(&self) -> SeenSet {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "Starting fresh - no previous data found at {}",
                    self.path.display()
                );
                return SeenSet::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read seen posts from {}, starting fresh: {}",
                    self.path.display(),
                    e
                );
                return SeenSet::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(ids) => {
                let seen: SeenSet = ids.into_iter().collect();
                tracing::debug!("Loaded {} seen posts from {}", seen.len(), self.path.display());
                seen
            }
            Err(e) => {
                tracing::warn!(
                    "Corrupted seen posts file {}, starting fresh: {}",
                    self.path.display(),
                    e
                );
                SeenSet::new()
            }
        }
    }

    /// Write the full seen set to disk, replacing prior contents
    ///
    /// Creates parent directories if needed. The write is not atomic.
    pub fn save(&self, seen: &SeenSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }

        let ids: Vec<&str> = seen.iter().collect();
        let json = serde_json::to_string(&ids).map_err(StoreError::Serialize)?;
        std::fs::write(&self.path, json).map_err(StoreError::Io)?;

        tracing::debug!("Saved {} seen posts to {}", seen.len(), self.path.display());
        Ok(())
    }
}
