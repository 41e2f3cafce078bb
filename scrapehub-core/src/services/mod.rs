//! Business logic services

mod backend_service;
mod bootstrap_service;
mod module_metadata_service;
mod prompt;

pub use backend_service::BackendService;
pub use bootstrap_service::BackendBootstrapService;
pub use module_metadata_service::ModuleMetadataService;
pub use prompt::{Terminal, ValuePrompter};

use std::sync::Arc;

use scrapehub_module::{AnyBackend, BackendsConfig, Context, ModuleLoader, Storage};

use crate::error::{CoreError, CoreResult};
use crate::traits::{BackendRegistry, ModuleRegistry};

/// Service context - holds every dependency
///
/// The platform layer builds it and injects its storage implementations.
pub struct ServiceContext {
    /// Modules shipped with the application
    pub module_registry: Arc<dyn ModuleRegistry>,
    /// Loaded backend instances
    pub backend_registry: Arc<dyn BackendRegistry>,
    /// Context handed to every backend (prompt callbacks, backends config,
    /// logger settings)
    pub module_ctx: Context,
    /// Storage shared by the loaded backends
    pub storage: Option<Arc<dyn Storage>>,
}

impl ServiceContext {
    #[must_use]
    pub fn new(
        module_registry: Arc<dyn ModuleRegistry>,
        backend_registry: Arc<dyn BackendRegistry>,
        module_ctx: Context,
        storage: Option<Arc<dyn Storage>>,
    ) -> Self {
        Self {
            module_registry,
            backend_registry,
            module_ctx,
            storage,
        }
    }

    /// Get the loader of a module
    pub fn get_module(&self, name: &str) -> CoreResult<Arc<dyn ModuleLoader>> {
        self.module_registry
            .get(name)
            .ok_or_else(|| CoreError::ModuleNotFound(name.to_string()))
    }

    /// Get a loaded backend instance
    pub fn get_backend(&self, name: &str) -> CoreResult<Arc<dyn AnyBackend>> {
        self.backend_registry
            .get(name)
            .ok_or_else(|| CoreError::BackendNotFound(name.to_string()))
    }

    /// Backends config collaborator
    pub fn backends_config(&self) -> CoreResult<&Arc<dyn BackendsConfig>> {
        Ok(self.module_ctx.backends_config()?)
    }
}
