//! Object store and the in-memory repository built on top of it.

use crate::refs::{BRANCH_PREFIX, TAG_PREFIX};
use crate::{GitObject, ObjectId, RefStore, Result, StorageError};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Content-addressed object store.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: RwLock<HashMap<ObjectId, GitObject>>,
}

impl ObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object and returns its id. Storing an existing id is a no-op.
    pub fn put(&self, object: GitObject) -> ObjectId {
        let id = object.id;
        self.objects.write().entry(id).or_insert(object);
        id
    }

    /// Fetches an object by id.
    pub fn get(&self, id: &ObjectId) -> Result<GitObject> {
        self.objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(id.to_hex()))
    }

    /// True if the id is stored.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().contains_key(id)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// All stored ids, in no particular order.
    pub fn list_objects(&self) -> Vec<ObjectId> {
        self.objects.read().keys().copied().collect()
    }
}

/// A repository held entirely in memory: the scratch copy a migration
/// clones into and pushes from.
#[derive(Debug)]
pub struct Repository {
    /// Fully-qualified name, e.g. `PROJ/app`.
    pub name: String,
    /// Object store.
    pub objects: Arc<ObjectStore>,
    /// Reference store.
    pub refs: Arc<RefStore>,
}

impl Repository {
    /// Creates an empty repository with no references.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Arc::new(ObjectStore::new()),
            refs: Arc::new(RefStore::new()),
        }
    }

    /// Branches as `(short name, tip)`, in name order.
    pub fn branches(&self) -> Vec<(String, ObjectId)> {
        strip_prefix(self.refs.list_direct(BRANCH_PREFIX), BRANCH_PREFIX)
    }

    /// Tags as `(short name, target)`, in name order.
    pub fn tags(&self) -> Vec<(String, ObjectId)> {
        strip_prefix(self.refs.list_direct(TAG_PREFIX), TAG_PREFIX)
    }

    /// Branch HEAD points at.
    pub fn head_branch(&self) -> Option<String> {
        self.refs.current_branch()
    }

    /// Renames a branch by short name, keeping HEAD attached to it.
    pub fn rename_branch(&self, from: &str, to: &str) -> Result<()> {
        if to.is_empty() {
            return Err(StorageError::InvalidRef(format!(
                "cannot rename branch {from} to an empty name"
            )));
        }
        self.refs
            .rename(&format!("{BRANCH_PREFIX}{from}"), &format!("{BRANCH_PREFIX}{to}"))?;
        debug!(repo = %self.name, from, to, "Renamed branch");
        Ok(())
    }

    /// Every object reachable from the given tips, tips included.
    ///
    /// Fails with [`StorageError::ObjectNotFound`] if the graph is not
    /// closed, which makes this double as a connectivity check.
    pub fn reachable_objects(&self, tips: &[ObjectId]) -> Result<Vec<ObjectId>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<ObjectId> = tips.to_vec();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let object = self.objects.get(&id)?;
            order.push(id);
            stack.extend(object.referenced_ids()?);
        }

        Ok(order)
    }

    /// Tips of every branch and tag.
    pub fn ref_tips(&self) -> Vec<ObjectId> {
        let mut tips: Vec<ObjectId> = self
            .branches()
            .into_iter()
            .chain(self.tags())
            .map(|(_, id)| id)
            .collect();
        tips.sort();
        tips.dedup();
        tips
    }
}

fn strip_prefix(refs: Vec<(String, ObjectId)>, prefix: &str) -> Vec<(String, ObjectId)> {
    refs.into_iter()
        .map(|(name, id)| (name.trim_start_matches(prefix).to_string(), id))
        .collect()
}
