//! Module registry abstract Trait

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use scrapehub_module::ModuleLoader;

/// Module Registry Trait
///
/// Holds the loaders of every module the application ships, indexed by
/// module name.
pub trait ModuleRegistry: Send + Sync {
    /// Register a loader, replacing any loader with the same module name.
    fn register(&self, loader: Arc<dyn ModuleLoader>);

    /// Get the loader of a module.
    fn get(&self, name: &str) -> Option<Arc<dyn ModuleLoader>>;

    /// All loaders, ordered by module name.
    fn list(&self) -> Vec<Arc<dyn ModuleLoader>>;

    /// Loaders whose module has at least one of `caps` (all when `None`).
    fn iter_modules(&self, caps: Option<&[String]>) -> Vec<Arc<dyn ModuleLoader>> {
        self.list()
            .into_iter()
            .filter(|l| caps.is_none_or(|caps| l.descriptor().has_caps(caps)))
            .collect()
    }
}

/// In-memory module registry
#[derive(Clone)]
pub struct InMemoryModuleRegistry {
    loaders: Arc<RwLock<BTreeMap<String, Arc<dyn ModuleLoader>>>>,
}

impl InMemoryModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Registry pre-filled with `loaders`.
    pub fn with_loaders(loaders: impl IntoIterator<Item = Arc<dyn ModuleLoader>>) -> Self {
        let registry = Self::new();
        for loader in loaders {
            registry.register(loader);
        }
        registry
    }
}

impl Default for InMemoryModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry for InMemoryModuleRegistry {
    fn register(&self, loader: Arc<dyn ModuleLoader>) {
        let name = loader.descriptor().name.clone();
        log::debug!("Registered module \"{name}\"");
        self.loaders.write().insert(name, loader);
    }

    fn get(&self, name: &str) -> Option<Arc<dyn ModuleLoader>> {
        self.loaders.read().get(name).cloned()
    }

    fn list(&self) -> Vec<Arc<dyn ModuleLoader>> {
        self.loaders.read().values().cloned().collect()
    }
}
