#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `AppStateBuilder` and the `AppState` startup sequence.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Value as RawValue, json};

use scrapehub_app::adapters::JsonBackendsConfig;
use scrapehub_app::{AppStateBuilder, NoopStartupHooks, StartupHooks};
use scrapehub_core::error::CoreError;
use scrapehub_core::types::LoadReport;
use scrapehub_module::caps::CAP_BANK;
use scrapehub_module::{
    BackendConfig, BackendsConfig, InMemoryBackendsConfig, InMemoryStorage, Module,
    ModuleDescriptor, NoBrowser, Params, SecretStore, StoreError, Value, loader,
};

// ===== Test module =====

struct Bank {
    descriptor: ModuleDescriptor,
}

impl Default for Bank {
    fn default() -> Self {
        Self {
            descriptor: ModuleDescriptor::new("bank")
                .caps([CAP_BANK])
                .config(BackendConfig::schema([
                    Value::new("login").required(true),
                    Value::backend_password("password"),
                ])),
        }
    }
}

impl Module for Bank {
    type Browser = NoBrowser;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

fn params(pairs: &[(&str, RawValue)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

// ===== Mock Implementations =====

#[derive(Default)]
struct MapSecretStore {
    secrets: Mutex<HashMap<(String, String), String>>,
}

impl SecretStore for MapSecretStore {
    fn get_secret(&self, domain: &str, key: &str) -> Option<String> {
        self.secrets
            .lock()
            .get(&(domain.to_string(), key.to_string()))
            .cloned()
    }

    fn set_secret(&self, domain: &str, key: &str, secret: &str) -> Result<(), StoreError> {
        self.secrets
            .lock()
            .insert((domain.to_string(), key.to_string()), secret.to_string());
        Ok(())
    }

    fn delete_secret(&self, domain: &str, key: &str) -> Result<(), StoreError> {
        self.secrets
            .lock()
            .remove(&(domain.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct CountingHooks {
    before: AtomicUsize,
    loaded: AtomicUsize,
}

impl StartupHooks for CountingHooks {
    fn before_load(&self) {
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn after_load(&self, report: &LoadReport) {
        self.loaded.store(report.success_count(), Ordering::SeqCst);
    }
}

// ===== Builder =====

#[test]
fn build_requires_backends_config() {
    let result = AppStateBuilder::new().build();
    assert!(matches!(result, Err(CoreError::ValidationError(_))));
}

#[test]
fn build_registers_modules() {
    let state = AppStateBuilder::new()
        .backends_config(Arc::new(InMemoryBackendsConfig::new()))
        .module(loader::<Bank>())
        .build()
        .unwrap();

    let modules = state.module_metadata_service.list_modules(None);
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "bank");
    assert!(!state.is_startup_completed());
}

// ===== Startup =====

#[test]
fn startup_loads_configured_backends() {
    let config = Arc::new(InMemoryBackendsConfig::new());
    config
        .add_backend("mybank", "bank", &params(&[("login", json!("bob"))]), false)
        .unwrap();
    config
        .add_backend("broken", "bank", &Params::new(), false)
        .unwrap();

    let state = AppStateBuilder::new()
        .backends_config(config)
        .storage(Arc::new(InMemoryStorage::new()))
        .module(loader::<Bank>())
        .build()
        .unwrap();

    let hooks = CountingHooks::default();
    let report = state.run_startup(&hooks).unwrap();
    assert_eq!(report.loaded, vec!["mybank"]);
    assert_eq!(report.error_count(), 1);
    assert_eq!(hooks.before.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.loaded.load(Ordering::SeqCst), 1);
    assert!(state.is_startup_completed());

    assert!(state.ctx.get_backend("mybank").is_ok());
    assert_eq!(state.shutdown(), vec!["mybank"]);
    assert!(state.ctx.get_backend("mybank").is_err());
}

#[test]
fn startup_with_failing_config_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backends.json");
    let config = JsonBackendsConfig::open(&path).unwrap();
    std::fs::write(&path, "[]").unwrap();

    let state = AppStateBuilder::new()
        .backends_config(Arc::new(config))
        .build()
        .unwrap();
    assert!(state.run_startup(&NoopStartupHooks).is_err());
    assert!(state.is_startup_completed());
}

#[test]
fn secret_store_consulted_before_prompting() {
    let config = Arc::new(InMemoryBackendsConfig::new());
    config
        .add_backend(
            "mybank",
            "bank",
            &params(&[("login", json!("bob")), ("password", json!(""))]),
            false,
        )
        .unwrap();
    let secrets = Arc::new(MapSecretStore::default());
    secrets.set_secret("mybank", "password", "from-keyring").unwrap();

    let state = AppStateBuilder::new()
        .backends_config(config)
        .secret_store(secrets)
        .module(loader::<Bank>())
        .build()
        .unwrap();
    state.run_startup(&NoopStartupHooks).unwrap();

    let backend = state.ctx.get_backend("mybank").unwrap();
    assert_eq!(
        backend.config()["password"].get_str().unwrap(),
        "from-keyring"
    );
    // Secrets from the store are never written back.
    assert_eq!(backend.config().dump()["password"], json!(""));
}

#[test]
fn add_backend_through_json_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backends.json");

    let state = AppStateBuilder::new()
        .backends_config(Arc::new(JsonBackendsConfig::open(&path).unwrap()))
        .module(loader::<Bank>())
        .build()
        .unwrap();
    let name = state
        .backend_service
        .add_backend("bank", None, &params(&[("login", json!("bob"))]))
        .unwrap();
    assert_eq!(name, "bank");

    let stored: RawValue = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["bank"]["_module"], json!("bank"));
    assert_eq!(stored["bank"]["login"], json!("bob"));

    let report = state.run_startup(&NoopStartupHooks).unwrap();
    assert_eq!(report.loaded, vec!["bank"]);
}
