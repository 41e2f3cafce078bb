//! Platform-agnostic application bootstrap for scrapehub.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter injection),
//! and `StartupHooks` (platform-specific startup callbacks).

pub mod adapters;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scrapehub_core::error::{CoreError, CoreResult};
use scrapehub_core::services::{
    BackendBootstrapService, BackendService, ModuleMetadataService, ServiceContext,
};
use scrapehub_core::traits::{
    BackendRegistry, InMemoryBackendRegistry, InMemoryModuleRegistry, ModuleRegistry,
};
use scrapehub_core::types::LoadReport;
use scrapehub_module::{
    BackendsConfig, Context, LoggerSettings, ModuleLoader, Requests, SecretStore, Storage,
};

/// Platform-specific hooks for the startup sequence.
///
/// Use `NoopStartupHooks` when nothing has to happen around backend loading.
pub trait StartupHooks: Send + Sync {
    /// Called before the configured backends are loaded.
    fn before_load(&self) {}

    /// Called once loading is over, with its outcome.
    fn after_load(&self, _report: &LoadReport) {}
}

/// No-op startup hooks.
pub struct NoopStartupHooks;

impl StartupHooks for NoopStartupHooks {}

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. Every frontend constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (holds registries and collaborators)
    pub ctx: Arc<ServiceContext>,
    /// Backend instance management
    pub backend_service: BackendService,
    /// Backend loading and unloading
    pub bootstrap_service: BackendBootstrapService,
    /// Module metadata
    pub module_metadata_service: ModuleMetadataService,
    /// Whether the startup sequence has completed
    pub startup_completed: AtomicBool,
}

impl AppState {
    /// Load every configured backend. Sets `startup_completed` to `true`
    /// when done, even if loading failed.
    pub fn run_startup(&self, hooks: &dyn StartupHooks) -> CoreResult<LoadReport> {
        hooks.before_load();
        let result = self.bootstrap_service.load_backends(None, None, None);
        match &result {
            Ok(report) => {
                log::info!(
                    "Backend loading complete: {} succeeded, {} failed",
                    report.success_count(),
                    report.error_count()
                );
                hooks.after_load(report);
            }
            Err(e) => log::error!("Failed to load backends: {e}"),
        }
        self.startup_completed.store(true, Ordering::SeqCst);
        result
    }

    pub fn is_startup_completed(&self) -> bool {
        self.startup_completed.load(Ordering::SeqCst)
    }

    /// Deinit every loaded backend; returns their names.
    pub fn shutdown(&self) -> Vec<String> {
        self.bootstrap_service.unload_backends(None)
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `backends_config`: where backend instances are configured
///
/// # Optional
/// - `storage`: backend storage, none by default
/// - `requests`: prompt callbacks, empty by default
/// - `secret_store`: consulted before prompting for passwords
/// - `logger_settings`: defaults to `LoggerSettings::default()`
/// - `module_registry`: defaults to an empty `InMemoryModuleRegistry`
/// - `backend_registry`: defaults to `InMemoryBackendRegistry`
pub struct AppStateBuilder {
    backends_config: Option<Arc<dyn BackendsConfig>>,
    storage: Option<Arc<dyn Storage>>,
    requests: Option<Requests>,
    secret_store: Option<Arc<dyn SecretStore>>,
    logger_settings: Option<LoggerSettings>,
    module_registry: Option<Arc<dyn ModuleRegistry>>,
    backend_registry: Option<Arc<dyn BackendRegistry>>,
    modules: Vec<Arc<dyn ModuleLoader>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends_config: None,
            storage: None,
            requests: None,
            secret_store: None,
            logger_settings: None,
            module_registry: None,
            backend_registry: None,
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn backends_config(mut self, config: Arc<dyn BackendsConfig>) -> Self {
        self.backends_config = Some(config);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn requests(mut self, requests: Requests) -> Self {
        self.requests = Some(requests);
        self
    }

    #[must_use]
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    #[must_use]
    pub fn logger_settings(mut self, settings: LoggerSettings) -> Self {
        self.logger_settings = Some(settings);
        self
    }

    #[must_use]
    pub fn module_registry(mut self, registry: Arc<dyn ModuleRegistry>) -> Self {
        self.module_registry = Some(registry);
        self
    }

    #[must_use]
    pub fn backend_registry(mut self, registry: Arc<dyn BackendRegistry>) -> Self {
        self.backend_registry = Some(registry);
        self
    }

    /// Register a module loader on the module registry at build time.
    #[must_use]
    pub fn module(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.modules.push(loader);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub fn build(self) -> CoreResult<AppState> {
        let backends_config = self.backends_config.ok_or_else(|| {
            CoreError::ValidationError("backends_config is required".to_string())
        })?;

        let mut requests = self.requests.unwrap_or_default();
        if let Some(store) = self.secret_store {
            requests = requests.with_secret_store(store);
        }
        let module_ctx = Context::new()
            .with_requests(requests)
            .with_backends_config(backends_config)
            .with_logger_settings(self.logger_settings.unwrap_or_default());

        let module_registry = self
            .module_registry
            .unwrap_or_else(|| Arc::new(InMemoryModuleRegistry::new()));
        for loader in self.modules {
            module_registry.register(loader);
        }
        let backend_registry = self
            .backend_registry
            .unwrap_or_else(|| Arc::new(InMemoryBackendRegistry::new()));

        let ctx = Arc::new(ServiceContext::new(
            module_registry,
            backend_registry,
            module_ctx,
            self.storage,
        ));

        Ok(AppState {
            backend_service: BackendService::new(Arc::clone(&ctx)),
            bootstrap_service: BackendBootstrapService::new(Arc::clone(&ctx)),
            module_metadata_service: ModuleMetadataService::new(Arc::clone(&ctx)),
            ctx,
            startup_completed: AtomicBool::new(false),
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
