//! Durable record of already handled item ids.
//!
//! The file holds a single JSON array of id strings. Saves write a sibling
//! temporary file and rename it over the target, so readers only ever see a
//! complete previous or complete new version.

use flairwatch_core::{CoreError, ErrorExt};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Ids seen so far, in the order they were first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct ProcessedSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`; returns false when it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ProcessedSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ProcessedSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Serialize for ProcessedSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.order)
    }
}

/// File-backed storage for a [`ProcessedSet`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<ProcessedSet, CoreError> {
        let text = fs::read_to_string(&self.path)?;
        let set: ProcessedSet = serde_json::from_str(&text)?;
        Ok(set)
    }

    /// Load the set, falling back to an empty one when the file is missing
    /// or unreadable.
    pub fn load(&self) -> ProcessedSet {
        match self.try_load() {
            Ok(set) => {
                info!(
                    "Loaded {} processed ids from {}",
                    set.len(),
                    self.path.display()
                );
                set
            }
            Err(CoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No state file at {}, starting with an empty set",
                    self.path.display()
                );
                ProcessedSet::new()
            }
            Err(e) => {
                e.log_warn();
                warn!(
                    "Could not read state file {}, starting with an empty set",
                    self.path.display()
                );
                ProcessedSet::new()
            }
        }
    }

    pub fn try_save(&self, set: &ProcessedSet) -> Result<(), CoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec(set)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Save the set, logging instead of failing. Returns whether the file was
    /// written.
    pub fn save(&self, set: &ProcessedSet) -> bool {
        match self.try_save(set) {
            Ok(()) => {
                debug!("Saved {} processed ids to {}", set.len(), self.path.display());
                true
            }
            Err(e) => {
                e.log_warn();
                warn!("State not saved to {}", self.path.display());
                false
            }
        }
    }
}
