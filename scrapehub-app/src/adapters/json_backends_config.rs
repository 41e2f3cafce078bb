//! JSON-file backends config.
//!
//! One object per instance: `{"<instance>": {"_module": "<module>", ...}}`.
//! The file is created readable by its owner only and refused when other
//! users can read it, as it may hold passwords.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value as RawValue};

use scrapehub_module::{BackendEntry, BackendsConfig, MODULE_KEY, Params, StoreError, apply_add};

use super::fs::{check_permissions, read_json, write_json};

type Entries = BTreeMap<String, BackendEntry>;

/// Backends config persisted in a JSON file.
pub struct JsonBackendsConfig {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonBackendsConfig {
    /// Open `path`, creating an empty private file when absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        check_permissions(&path)?;
        if !path.exists() {
            write_json(&path, &RawValue::Object(Map::new()))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Entries, StoreError> {
        let Some(root) = read_json(&self.path)? else {
            return Ok(Entries::new());
        };
        let RawValue::Object(map) = root else {
            return Err(StoreError::Serialization(format!(
                "{}: expected an object",
                self.path.display()
            )));
        };

        let mut entries = Entries::new();
        for (name, value) in &map {
            match BackendEntry::from_json(name, value) {
                Some(entry) => {
                    entries.insert(name.clone(), entry);
                }
                None => log::warn!(
                    "Missing field \"{MODULE_KEY}\" for configured backend \"{name}\""
                ),
            }
        }
        Ok(entries)
    }

    fn write_all(&self, entries: &Entries) -> Result<(), StoreError> {
        let root: Map<String, RawValue> = entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.to_json()))
            .collect();
        write_json(&self.path, &RawValue::Object(root))
    }
}

impl BackendsConfig for JsonBackendsConfig {
    fn add_backend(
        &self,
        instname: &str,
        modname: &str,
        params: &Params,
        edit: bool,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        apply_add(&mut entries, instname, modname, params, edit)?;
        self.write_all(&entries)?;
        log::debug!("Backend \"{instname}\" written to {}", self.path.display());
        Ok(())
    }

    fn get_backend(&self, instname: &str) -> Result<BackendEntry, StoreError> {
        let _guard = self.lock.lock();
        self.read_all()?
            .remove(instname)
            .ok_or_else(|| StoreError::BackendNotFound(instname.to_string()))
    }

    fn remove_backend(&self, instname: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(instname).is_none() {
            return Ok(false);
        }
        self.write_all(&entries)?;
        Ok(true)
    }

    fn backend_exists(&self, instname: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.contains_key(instname))
    }

    fn iter_backends(&self) -> Result<Vec<BackendEntry>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.into_values().collect())
    }
}
