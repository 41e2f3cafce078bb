//! Key/value storage collaborators and the per-backend scoped view.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value as RawValue};

use crate::error::StoreError;

/// Hierarchical key/value storage shared by every backend of an application.
///
/// Paths address nested JSON objects; intermediate objects are created on
/// write.
pub trait Storage: Send + Sync {
    /// Value at `path`, or `default` when absent.
    fn get(&self, path: &[&str], default: RawValue) -> RawValue;

    fn set(&self, path: &[&str], value: RawValue) -> Result<(), StoreError>;

    /// Remove the value at `path`; removing an absent path is not an error.
    fn delete(&self, path: &[&str]) -> Result<(), StoreError>;

    /// Replace the subtree at `path` with `default_tree` overlaid by what is
    /// already stored there.
    fn load(&self, path: &[&str], default_tree: RawValue) -> Result<(), StoreError>;

    /// Persist the subtree at `path`.
    fn save(&self, path: &[&str]) -> Result<(), StoreError>;
}

/// JSON object tree with path operations, shared by storage implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageTree {
    root: RawValue,
}

impl Default for StorageTree {
    fn default() -> Self {
        Self {
            root: RawValue::Object(Map::new()),
        }
    }
}

impl StorageTree {
    /// Wrap an existing tree; non-object roots are replaced by an empty tree.
    pub fn from_value(root: RawValue) -> Self {
        if root.is_object() {
            Self { root }
        } else {
            Self::default()
        }
    }

    pub fn as_value(&self) -> &RawValue {
        &self.root
    }

    pub fn get(&self, path: &[&str]) -> Option<&RawValue> {
        path.iter()
            .try_fold(&self.root, |node, key| node.as_object()?.get(*key))
    }

    pub fn set(&mut self, path: &[&str], value: RawValue) {
        let Some((last, parents)) = path.split_last() else {
            self.root = if value.is_object() {
                value
            } else {
                RawValue::Object(Map::new())
            };
            return;
        };

        let mut node = &mut self.root;
        for key in parents {
            if !node.is_object() {
                *node = RawValue::Object(Map::new());
            }
            let RawValue::Object(map) = node else {
                return;
            };
            node = map
                .entry((*key).to_string())
                .or_insert_with(|| RawValue::Object(Map::new()));
        }
        if !node.is_object() {
            *node = RawValue::Object(Map::new());
        }
        if let RawValue::Object(map) = node {
            map.insert((*last).to_string(), value);
        }
    }

    pub fn delete(&mut self, path: &[&str]) -> Option<RawValue> {
        let (last, parents) = path.split_last()?;
        let mut node = &mut self.root;
        for key in parents {
            node = node.as_object_mut()?.get_mut(*key)?;
        }
        node.as_object_mut()?.remove(*last)
    }

    /// Store `default_tree` overlaid with the current content at `path`.
    pub fn load(&mut self, path: &[&str], default_tree: RawValue) {
        let merged = match self.get(path) {
            Some(stored) => merge(default_tree, stored.clone()),
            None => default_tree,
        };
        self.set(path, merged);
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, other values replace.
fn merge(base: RawValue, overlay: RawValue) -> RawValue {
    match (base, overlay) {
        (RawValue::Object(mut base), RawValue::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            RawValue::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Non-persistent [`Storage`].
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tree: RwLock<StorageTree>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> RawValue {
        self.tree.read().as_value().clone()
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, path: &[&str], default: RawValue) -> RawValue {
        self.tree.read().get(path).cloned().unwrap_or(default)
    }

    fn set(&self, path: &[&str], value: RawValue) -> Result<(), StoreError> {
        self.tree.write().set(path, value);
        Ok(())
    }

    fn delete(&self, path: &[&str]) -> Result<(), StoreError> {
        self.tree.write().delete(path);
        Ok(())
    }

    fn load(&self, path: &[&str], default_tree: RawValue) -> Result<(), StoreError> {
        self.tree.write().load(path, default_tree);
        Ok(())
    }

    fn save(&self, _path: &[&str]) -> Result<(), StoreError> {
        Ok(())
    }
}

const BACKENDS_ROOT: &str = "backends";

/// View of a [`Storage`] scoped under `backends/<name>`.
///
/// Without an attached storage, reads return the caller default and writes
/// are no-ops.
#[derive(Clone)]
pub struct BackendStorage {
    name: String,
    storage: Option<Arc<dyn Storage>>,
}

impl BackendStorage {
    pub fn new(name: impl Into<String>, storage: Option<Arc<dyn Storage>>) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_attached(&self) -> bool {
        self.storage.is_some()
    }

    fn scoped<'a>(&'a self, path: &[&'a str]) -> Vec<&'a str> {
        [BACKENDS_ROOT, self.name.as_str()]
            .into_iter()
            .chain(path.iter().copied())
            .collect()
    }

    pub fn get(&self, path: &[&str], default: RawValue) -> RawValue {
        match &self.storage {
            Some(storage) => storage.get(&self.scoped(path), default),
            None => default,
        }
    }

    pub fn set(&self, path: &[&str], value: RawValue) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.set(&self.scoped(path), value),
            None => Ok(()),
        }
    }

    pub fn delete(&self, path: &[&str]) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.delete(&self.scoped(path)),
            None => Ok(()),
        }
    }

    /// Initialize the backend subtree from `default_tree`, keeping stored data.
    pub fn load(&self, default_tree: RawValue) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.load(&self.scoped(&[]), default_tree),
            None => Ok(()),
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.save(&self.scoped(&[])),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for BackendStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendStorage")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}
