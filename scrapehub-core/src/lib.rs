//! # scrapehub-core
//!
//! Application services on top of `scrapehub-module`: which modules are
//! available, which backend instances are configured, and which of them are
//! loaded.
//!
//! Services share a [`services::ServiceContext`] holding the registries and
//! the module [`Context`](scrapehub_module::Context) (prompt callbacks,
//! backends config, logger settings). Everything is synchronous; the backend
//! lock of `scrapehub-module` is the only serialization point for calls into
//! a backend.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use services::{
    BackendBootstrapService, BackendService, ModuleMetadataService, ServiceContext, Terminal,
    ValuePrompter,
};
pub use traits::{BackendRegistry, InMemoryBackendRegistry, InMemoryModuleRegistry, ModuleRegistry};
pub use types::{BackendInfo, LoadFailure, LoadReport, ModuleInfo, ValueInfo};
