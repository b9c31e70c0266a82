//! Schema dependency index.
//!
//! Tracks, for each schema resource, the data resources that were matched
//! to it by naming convention. Editing a schema re-validates exactly the
//! resources listed here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Schema → ordered dependents. Dependents keep insertion order and never
/// repeat. Entries whose last dependent leaves are dropped.
///
/// A data resource is listed under at most one schema: [`record`](Self::record)
/// moves it away from any schema it was previously matched to.
///
/// Lookups by data resource scan every entry. Both counts are bounded by the
/// size of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaIndex {
    dependents: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl SchemaIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `data` with `schema`, creating the schema entry if needed.
    ///
    /// Idempotent. Returns `true` if the pair was not already recorded.
    pub fn record(&mut self, schema: &Path, data: &Path) -> bool {
        for (other, list) in &mut self.dependents {
            if other != schema && remove_item(list, data) {
                debug!(
                    "{} moved from schema {} to {}",
                    data.display(),
                    other.display(),
                    schema.display()
                );
            }
        }
        self.dependents.retain(|s, list| s == schema || !list.is_empty());

        let list = self.dependents.entry(schema.to_path_buf()).or_default();
        if list.iter().any(|d| d == data) {
            return false;
        }
        list.push(data.to_path_buf());
        true
    }

    /// Dependents of `schema` in insertion order. Empty if unknown.
    #[must_use]
    pub fn dependents_of(&self, schema: &Path) -> &[PathBuf] {
        self.dependents.get(schema).map_or(&[], Vec::as_slice)
    }

    /// The schema `data` is currently listed under, if any.
    #[must_use]
    pub fn schema_of(&self, data: &Path) -> Option<&Path> {
        self.dependents
            .iter()
            .find(|(_, list)| list.iter().any(|d| d == data))
            .map(|(schema, _)| schema.as_path())
    }

    /// Drops the entry for `schema` and returns its former dependents.
    pub fn remove_schema(&mut self, schema: &Path) -> Vec<PathBuf> {
        self.dependents.remove(schema).unwrap_or_default()
    }

    /// Removes `data` from whichever schema lists it.
    ///
    /// Returns that schema, or `None` if `data` was not listed (no-op).
    pub fn remove_data(&mut self, data: &Path) -> Option<PathBuf> {
        let schema = self.schema_of(data)?.to_path_buf();
        if let Some(list) = self.dependents.get_mut(&schema) {
            remove_item(list, data);
            if list.is_empty() {
                self.dependents.remove(&schema);
            }
        }
        Some(schema)
    }

    /// Number of schema entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    /// Returns `true` if no schema is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }
}

fn remove_item(list: &mut Vec<PathBuf>, item: &Path) -> bool {
    let before = list.len();
    list.retain(|d| d != item);
    list.len() != before
}

/// Cloneable handle to a [`SchemaIndex`] shared between event sources.
///
/// Every operation takes the lock for its whole duration. Readers get owned
/// snapshots, so a cascade iterates a list that later mutations cannot touch.
#[derive(Debug, Clone, Default)]
pub struct SharedSchemaIndex {
    inner: Arc<Mutex<SchemaIndex>>,
}

impl SharedSchemaIndex {
    /// Creates a handle to a new, empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`SchemaIndex::record`].
    pub fn record(&self, schema: &Path, data: &Path) -> bool {
        self.inner.lock().record(schema, data)
    }

    /// Snapshot of [`SchemaIndex::dependents_of`].
    #[must_use]
    pub fn dependents_of(&self, schema: &Path) -> Vec<PathBuf> {
        self.inner.lock().dependents_of(schema).to_vec()
    }

    /// See [`SchemaIndex::schema_of`].
    #[must_use]
    pub fn schema_of(&self, data: &Path) -> Option<PathBuf> {
        self.inner.lock().schema_of(data).map(Path::to_path_buf)
    }

    /// See [`SchemaIndex::remove_schema`].
    pub fn remove_schema(&self, schema: &Path) -> Vec<PathBuf> {
        self.inner.lock().remove_schema(schema)
    }

    /// See [`SchemaIndex::remove_data`].
    pub fn remove_data(&self, data: &Path) -> Option<PathBuf> {
        self.inner.lock().remove_data(data)
    }

    /// Copy of the whole index.
    #[must_use]
    pub fn snapshot(&self) -> SchemaIndex {
        self.inner.lock().clone()
    }
}
