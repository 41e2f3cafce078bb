//! Backend bootstrap service
//!
//! Instantiates the configured backends at startup and tears them down.

use std::sync::Arc;

use scrapehub_module::{AnyBackend, Storage};

use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::types::{LoadFailure, LoadReport};

/// Backend bootstrap service
pub struct BackendBootstrapService {
    ctx: Arc<ServiceContext>,
}

impl BackendBootstrapService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Load configured instances.
    ///
    /// Instances not named in `names` or whose module has none of `caps` are
    /// skipped. `storage` overrides the context storage. A failing instance
    /// is logged and reported, the others still load.
    pub fn load_backends(
        &self,
        caps: Option<&[String]>,
        names: Option<&[String]>,
        storage: Option<Arc<dyn Storage>>,
    ) -> CoreResult<LoadReport> {
        let storage = storage.or_else(|| self.ctx.storage.clone());
        let mut report = LoadReport::default();

        for entry in self.ctx.backends_config()?.iter_backends()? {
            if names.is_some_and(|names| !names.contains(&entry.name)) {
                continue;
            }

            let Some(loader) = self.ctx.module_registry.get(&entry.module) else {
                log::warn!(
                    "Unable to load module \"{}\" for backend \"{}\"",
                    entry.module,
                    entry.name
                );
                report.errors.push(LoadFailure {
                    name: entry.name,
                    error: format!("Module not found: {}", entry.module),
                });
                continue;
            };

            if caps.is_some_and(|caps| !loader.descriptor().has_caps(caps)) {
                continue;
            }

            let backend = match loader.create_instance(
                &self.ctx.module_ctx,
                &entry.name,
                &entry.params,
                storage.clone(),
                None,
                false,
            ) {
                Ok(b) => Arc::<dyn AnyBackend>::from(b),
                Err(e) => {
                    if e.is_expected() {
                        log::warn!("Unable to load backend \"{}\": {e}", entry.name);
                    } else {
                        log::error!("Unable to load backend \"{}\": {e}", entry.name);
                    }
                    report.errors.push(LoadFailure {
                        name: entry.name,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            log::debug!(
                "Created backend instance \"{}\" for module \"{}\"",
                entry.name,
                entry.module
            );
            if let Some(previous) = self.ctx.backend_registry.register(backend) {
                deinit_quietly(previous.as_ref());
            }
            report.loaded.push(entry.name);
        }

        log::info!(
            "Backends loaded: {} success, {} failed",
            report.success_count(),
            report.error_count()
        );
        Ok(report)
    }

    /// Deinit and forget loaded instances (all when `names` is `None`).
    /// Returns the names actually unloaded.
    pub fn unload_backends(&self, names: Option<&[String]>) -> Vec<String> {
        let targets = names.map_or_else(|| self.ctx.backend_registry.list_names(), <[_]>::to_vec);

        let mut unloaded = Vec::new();
        for name in targets {
            let Some(backend) = self.ctx.backend_registry.unregister(&name) else {
                continue;
            };
            deinit_quietly(backend.as_ref());
            unloaded.push(name);
        }
        unloaded
    }
}

fn deinit_quietly(backend: &dyn AnyBackend) {
    if let Err(e) = backend.deinit() {
        log::warn!("[{}] Deinit failed: {e}", backend.name());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_utils::{bank_params, create_test_context};
    use scrapehub_module::{BackendState, InMemoryStorage, Params};

    fn configure(ctx: &ServiceContext, name: &str, module: &str, params: &Params) {
        ctx.backends_config()
            .unwrap()
            .add_backend(name, module, params, false)
            .unwrap();
    }

    #[test]
    fn load_all_configured() {
        let (ctx, _) = create_test_context();
        configure(&ctx, "bank1", "testbank", &bank_params());
        configure(&ctx, "feeds", "testnews", &Params::new());
        let svc = BackendBootstrapService::new(Arc::clone(&ctx));

        let report = svc.load_backends(None, None, None).unwrap();
        assert_eq!(report.loaded, vec!["bank1", "feeds"]);
        assert_eq!(report.error_count(), 0);
        assert!(ctx.get_backend("bank1").is_ok());
    }

    #[test]
    fn failures_do_not_abort() {
        let (ctx, _) = create_test_context();
        configure(&ctx, "broken", "testbank", &Params::new());
        configure(&ctx, "ghost", "unknown", &Params::new());
        configure(&ctx, "ok", "testbank", &bank_params());
        let svc = BackendBootstrapService::new(Arc::clone(&ctx));

        let report = svc.load_backends(None, None, None).unwrap();
        assert_eq!(report.loaded, vec!["ok"]);
        let failed: Vec<&str> = report.errors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["broken", "ghost"]);
    }

    #[test]
    fn filter_by_caps_and_names() {
        let (ctx, _) = create_test_context();
        configure(&ctx, "bank1", "testbank", &bank_params());
        configure(&ctx, "bank2", "testbank", &bank_params());
        configure(&ctx, "feeds", "testnews", &Params::new());
        let svc = BackendBootstrapService::new(Arc::clone(&ctx));

        let caps = vec!["CapNews".to_string()];
        let report = svc.load_backends(Some(&caps), None, None).unwrap();
        assert_eq!(report.loaded, vec!["feeds"]);

        let names = vec!["bank2".to_string()];
        let report = svc.load_backends(None, Some(&names), None).unwrap();
        assert_eq!(report.loaded, vec!["bank2"]);
        assert!(ctx.get_backend("bank1").is_err());
    }

    #[test]
    fn storage_override() {
        let (ctx, _) = create_test_context();
        configure(&ctx, "bank1", "testbank", &bank_params());
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let svc = BackendBootstrapService::new(Arc::clone(&ctx));

        svc.load_backends(None, None, Some(Arc::clone(&storage))).unwrap();
        let backend = ctx.get_backend("bank1").unwrap();
        backend.storage().set(&["k"], json!(1)).unwrap();
        assert_eq!(storage.get(&["backends", "bank1", "k"], json!(null)), json!(1));
    }

    #[test]
    fn unload_deinitializes() {
        let (ctx, _) = create_test_context();
        configure(&ctx, "bank1", "testbank", &bank_params());
        configure(&ctx, "bank2", "testbank", &bank_params());
        let svc = BackendBootstrapService::new(Arc::clone(&ctx));
        svc.load_backends(None, None, None).unwrap();

        let bank1 = ctx.get_backend("bank1").unwrap();
        let names = vec!["bank1".to_string(), "missing".to_string()];
        assert_eq!(svc.unload_backends(Some(&names)), vec!["bank1"]);
        assert_eq!(bank1.state(), BackendState::Deinitialized);

        assert_eq!(svc.unload_backends(None), vec!["bank2"]);
        assert!(ctx.backend_registry.list_names().is_empty());
    }
}
