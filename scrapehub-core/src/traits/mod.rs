//! Registry abstractions shared by the services.

mod backend_registry;
mod module_registry;

pub use backend_registry::{BackendRegistry, InMemoryBackendRegistry};
pub use module_registry::{InMemoryModuleRegistry, ModuleRegistry};
