//! Module metadata service
//!
//! Static information about the registered modules (stateless service)

use std::sync::Arc;

use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::types::ModuleInfo;

/// Module metadata service (stateless)
pub struct ModuleMetadataService {
    ctx: Arc<ServiceContext>,
}

impl ModuleMetadataService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Modules having at least one of `caps`, or every module.
    pub fn list_modules(&self, caps: Option<&[String]>) -> Vec<ModuleInfo> {
        self.ctx
            .module_registry
            .iter_modules(caps)
            .iter()
            .map(|l| ModuleInfo::from(l.descriptor()))
            .collect()
    }

    pub fn get_module(&self, name: &str) -> CoreResult<ModuleInfo> {
        let loader = self.ctx.get_module(name)?;
        Ok(ModuleInfo::from(loader.descriptor()))
    }
}
