//! Reference storage.

use crate::{ObjectId, Result, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Prefix of branch references.
pub const BRANCH_PREFIX: &str = "refs/heads/";
/// Prefix of tag references.
pub const TAG_PREFIX: &str = "refs/tags/";

/// A git reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Points straight at an object.
    Direct(ObjectId),
    /// Points at another reference, e.g. `HEAD -> refs/heads/main`.
    Symbolic(String),
}

impl Reference {
    /// Returns the object id of a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }
}

/// Thread-safe, name-ordered reference store.
#[derive(Debug, Default)]
pub struct RefStore {
    refs: RwLock<BTreeMap<String, Reference>>,
}

impl RefStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a reference by full name.
    pub fn get(&self, name: &str) -> Result<Reference> {
        self.refs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::RefNotFound(name.to_string()))
    }

    /// Points `name` at `target`.
    pub fn set(&self, name: &str, target: ObjectId) {
        self.refs
            .write()
            .insert(name.to_string(), Reference::Direct(target));
    }

    /// Makes `name` a symbolic reference to `target`.
    pub fn set_symbolic(&self, name: &str, target: &str) {
        self.refs
            .write()
            .insert(name.to_string(), Reference::Symbolic(target.to_string()));
    }

    /// Removes a reference.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.refs
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::RefNotFound(name.to_string()))
    }

    /// Direct references under `prefix`, in name order.
    pub fn list_direct(&self, prefix: &str) -> Vec<(String, ObjectId)> {
        self.refs
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .filter_map(|(name, r)| r.as_direct().map(|id| (name.clone(), id)))
            .collect()
    }

    /// Every reference, in name order.
    pub fn list_all(&self) -> Vec<(String, Reference)> {
        self.refs
            .read()
            .iter()
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect()
    }

    /// Number of stored references, symbolic ones included.
    pub fn len(&self) -> usize {
        self.refs.read().len()
    }

    /// True when no reference is stored.
    pub fn is_empty(&self) -> bool {
        self.refs.read().is_empty()
    }

    /// Resolves `name`, following at most one level of symbolic indirection.
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        match self.get(name)? {
            Reference::Direct(id) => Ok(id),
            Reference::Symbolic(target) => match self.get(&target)? {
                Reference::Direct(id) => Ok(id),
                Reference::Symbolic(_) => Err(StorageError::InvalidRef(format!(
                    "nested symbolic reference at {target}"
                ))),
            },
        }
    }

    /// Branch name HEAD points at, if HEAD is symbolic.
    pub fn current_branch(&self) -> Option<String> {
        match self.get("HEAD").ok()? {
            Reference::Symbolic(target) => target.strip_prefix(BRANCH_PREFIX).map(str::to_string),
            Reference::Direct(_) => None,
        }
    }

    /// Renames a direct reference. Symbolic references pointing at `from`
    /// are retargeted to `to`. Fails if `to` already exists.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut refs = self.refs.write();
        if refs.contains_key(to) {
            return Err(StorageError::InvalidRef(format!(
                "cannot rename {from} to {to}: target exists"
            )));
        }
        let reference = refs
            .remove(from)
            .ok_or_else(|| StorageError::RefNotFound(from.to_string()))?;
        refs.insert(to.to_string(), reference);

        for reference in refs.values_mut() {
            if matches!(reference, Reference::Symbolic(target) if target == from) {
                *reference = Reference::Symbolic(to.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 20])
    }

    #[test]
    fn test_set_get_and_resolve_head() {
        let store = RefStore::new();
        store.set("refs/heads/main", id(1));
        store.set_symbolic("HEAD", "refs/heads/main");

        assert_eq!(store.current_branch(), Some("main".to_string()));
        assert_eq!(store.resolve("HEAD").unwrap(), id(1));
        assert_eq!(store.get("refs/heads/main").unwrap(), Reference::Direct(id(1)));
    }

    #[test]
    fn test_get_missing() {
        let store = RefStore::new();
        assert!(matches!(
            store.get("refs/heads/nope"),
            Err(StorageError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_list_direct_is_ordered_and_skips_symbolic() {
        let store = RefStore::new();
        store.set("refs/heads/zeta", id(1));
        store.set("refs/heads/alpha", id(2));
        store.set("refs/tags/v1", id(3));
        store.set_symbolic("HEAD", "refs/heads/alpha");

        let branches = store.list_direct(BRANCH_PREFIX);
        assert_eq!(
            branches,
            vec![
                ("refs/heads/alpha".to_string(), id(2)),
                ("refs/heads/zeta".to_string(), id(1)),
            ]
        );
        assert_eq!(store.list_direct(TAG_PREFIX).len(), 1);
        assert_eq!(store.list_all().len(), 4);
    }

    #[test]
    fn test_delete() {
        let store = RefStore::new();
        store.set("refs/heads/feature", id(1));
        store.delete("refs/heads/feature").unwrap();
        assert!(store.get("refs/heads/feature").is_err());
        assert!(store.delete("refs/heads/feature").is_err());
    }

    #[test]
    fn test_rename_retargets_head() {
        let store = RefStore::new();
        store.set("refs/heads/master", id(1));
        store.set_symbolic("HEAD", "refs/heads/master");

        store.rename("refs/heads/master", "refs/heads/main").unwrap();

        assert!(store.get("refs/heads/master").is_err());
        assert_eq!(store.current_branch(), Some("main".to_string()));
        assert_eq!(store.resolve("HEAD").unwrap(), id(1));
    }

    #[test]
    fn test_rename_refuses_to_clobber() {
        let store = RefStore::new();
        store.set("refs/heads/master", id(1));
        store.set("refs/heads/main", id(2));

        assert!(matches!(
            store.rename("refs/heads/master", "refs/heads/main"),
            Err(StorageError::InvalidRef(_))
        ));
        assert_eq!(store.resolve("refs/heads/main").unwrap(), id(2));
    }

    #[test]
    fn test_nested_symbolic_rejected() {
        let store = RefStore::new();
        store.set_symbolic("HEAD", "refs/remotes/origin/HEAD");
        store.set_symbolic("refs/remotes/origin/HEAD", "refs/heads/main");
        assert!(store.resolve("HEAD").is_err());
    }
}
