//! Persisted list of configured backend instances.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::{Map, Value as RawValue};

use crate::config::Params;
use crate::error::StoreError;

/// Key holding the module name inside a persisted instance.
pub const MODULE_KEY: &str = "_module";

/// One configured backend instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEntry {
    /// Instance name.
    pub name: String,
    /// Module implementing the instance.
    pub module: String,
    /// Persisted parameters, private `_` keys included.
    pub params: Params,
}

impl BackendEntry {
    /// Persisted shape: `{"_module": module, param: value, ...}`.
    pub fn to_json(&self) -> RawValue {
        let mut map: Map<String, RawValue> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert(MODULE_KEY.to_string(), RawValue::String(self.module.clone()));
        RawValue::Object(map)
    }

    /// Parse the persisted shape; `None` when the module key is missing.
    pub fn from_json(name: &str, value: &RawValue) -> Option<Self> {
        let map = value.as_object()?;
        let module = map.get(MODULE_KEY)?.as_str()?.to_string();
        let params = map
            .iter()
            .filter(|(k, _)| k.as_str() != MODULE_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self {
            name: name.to_string(),
            module,
            params,
        })
    }
}

/// Store of backend instance configurations.
pub trait BackendsConfig: Send + Sync {
    /// Create an instance, or update it when `edit` is set.
    ///
    /// Fails with [`StoreError::BackendAlreadyExists`] when the instance
    /// exists and `edit` is not set. Editing overlays `params` on the stored
    /// ones.
    fn add_backend(
        &self,
        instname: &str,
        modname: &str,
        params: &Params,
        edit: bool,
    ) -> Result<(), StoreError>;

    /// Fails with [`StoreError::BackendNotFound`] for unknown instances.
    fn get_backend(&self, instname: &str) -> Result<BackendEntry, StoreError>;

    /// Returns whether something was removed.
    fn remove_backend(&self, instname: &str) -> Result<bool, StoreError>;

    fn backend_exists(&self, instname: &str) -> Result<bool, StoreError>;

    /// Every instance, ordered by name.
    fn iter_backends(&self) -> Result<Vec<BackendEntry>, StoreError>;
}

/// Apply an add/edit request to a name-indexed map of entries.
///
/// Shared by the in-memory and file-backed stores.
pub fn apply_add(
    entries: &mut BTreeMap<String, BackendEntry>,
    instname: &str,
    modname: &str,
    params: &Params,
    edit: bool,
) -> Result<(), StoreError> {
    if instname.trim().is_empty() {
        return Err(StoreError::InvalidName(instname.to_string()));
    }
    match entries.get_mut(instname) {
        Some(_) if !edit => Err(StoreError::BackendAlreadyExists(instname.to_string())),
        Some(entry) => {
            entry.module = modname.to_string();
            entry
                .params
                .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        }
        None => {
            entries.insert(
                instname.to_string(),
                BackendEntry {
                    name: instname.to_string(),
                    module: modname.to_string(),
                    params: params.clone(),
                },
            );
            Ok(())
        }
    }
}

/// Non-persistent [`BackendsConfig`].
#[derive(Debug, Default)]
pub struct InMemoryBackendsConfig {
    entries: RwLock<BTreeMap<String, BackendEntry>>,
}

impl InMemoryBackendsConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendsConfig for InMemoryBackendsConfig {
    fn add_backend(
        &self,
        instname: &str,
        modname: &str,
        params: &Params,
        edit: bool,
    ) -> Result<(), StoreError> {
        apply_add(&mut self.entries.write(), instname, modname, params, edit)
    }

    fn get_backend(&self, instname: &str) -> Result<BackendEntry, StoreError> {
        self.entries
            .read()
            .get(instname)
            .cloned()
            .ok_or_else(|| StoreError::BackendNotFound(instname.to_string()))
    }

    fn remove_backend(&self, instname: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(instname).is_some())
    }

    fn backend_exists(&self, instname: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().contains_key(instname))
    }

    fn iter_backends(&self) -> Result<Vec<BackendEntry>, StoreError> {
        Ok(self.entries.read().values().cloned().collect())
    }
}
