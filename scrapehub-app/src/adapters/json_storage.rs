//! JSON-file storage.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::Value as RawValue;

use scrapehub_module::{Storage, StorageTree, StoreError};

use super::fs::{read_json, write_json};

/// [`Storage`] kept in memory and written as one JSON document on `save`.
pub struct JsonFileStorage {
    path: PathBuf,
    tree: RwLock<StorageTree>,
}

impl JsonFileStorage {
    /// Open `path`; an absent file starts an empty tree.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tree = read_json(&path)?.map(StorageTree::from_value).unwrap_or_default();
        Ok(Self {
            path,
            tree: RwLock::new(tree),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonFileStorage {
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

    /// The whole document is written whatever `path` is.
    fn save(&self, path: &[&str]) -> Result<(), StoreError> {
        let tree = self.tree.read();
        write_json(&self.path, tree.as_value())?;
        log::debug!("Storage saved ({}) to {}", path.join("/"), self.path.display());
        Ok(())
    }
}
