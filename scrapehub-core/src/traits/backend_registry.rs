//! Loaded-backend registry abstract Trait

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use scrapehub_module::AnyBackend;

/// Backend Registry Trait
///
/// Loaded backend instances, indexed by instance name.
pub trait BackendRegistry: Send + Sync {
    /// Register an instance; returns the instance it replaces, if any.
    fn register(&self, backend: Arc<dyn AnyBackend>) -> Option<Arc<dyn AnyBackend>>;

    /// Remove an instance from the registry.
    fn unregister(&self, name: &str) -> Option<Arc<dyn AnyBackend>>;

    fn get(&self, name: &str) -> Option<Arc<dyn AnyBackend>>;

    /// Loaded instance names, ordered.
    fn list_names(&self) -> Vec<String>;

    /// Loaded instances having at least one of `caps` (all when `None`),
    /// ordered by name.
    fn iter_backends(&self, caps: Option<&[String]>) -> Vec<Arc<dyn AnyBackend>>;
}

/// In-memory backend registry
#[derive(Clone)]
pub struct InMemoryBackendRegistry {
    backends: Arc<RwLock<BTreeMap<String, Arc<dyn AnyBackend>>>>,
}

impl InMemoryBackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryBackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry for InMemoryBackendRegistry {
    fn register(&self, backend: Arc<dyn AnyBackend>) -> Option<Arc<dyn AnyBackend>> {
        self.backends
            .write()
            .insert(backend.name().to_string(), backend)
    }

    fn unregister(&self, name: &str) -> Option<Arc<dyn AnyBackend>> {
        self.backends.write().remove(name)
    }

    fn get(&self, name: &str) -> Option<Arc<dyn AnyBackend>> {
        self.backends.read().get(name).cloned()
    }

    fn list_names(&self) -> Vec<String> {
        self.backends.read().keys().cloned().collect()
    }

    fn iter_backends(&self, caps: Option<&[String]>) -> Vec<Arc<dyn AnyBackend>> {
        self.backends
            .read()
            .values()
            .filter(|b| caps.is_none_or(|caps| b.has_caps(caps)))
            .cloned()
            .collect()
    }
}
