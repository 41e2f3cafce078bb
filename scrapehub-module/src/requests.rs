//! Callbacks through which the framework asks the application for data it
//! does not have, typically a password that was not configured.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::value::{SecretStore, Value};

/// Request emitted when a password has to be typed by the operator.
pub const LOGIN_REQUEST: &str = "login";

/// Callback answering a request for `(domain, value)`.
pub type RequestCallback = Arc<dyn Fn(&str, &Value) -> Option<String> + Send + Sync>;

/// Shared registry of request callbacks.
///
/// Cloning is cheap and clones share the same callbacks.
#[derive(Clone, Default)]
pub struct Requests {
    callbacks: Arc<RwLock<HashMap<String, RequestCallback>>>,
    secret_store: Option<Arc<dyn SecretStore>>,
}

impl Requests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `store` for passwords before asking the operator.
    #[must_use]
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    pub fn secret_store(&self) -> Option<&Arc<dyn SecretStore>> {
        self.secret_store.as_ref()
    }

    /// Register (or replace) the callback for `name`.
    pub fn register<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&str, &Value) -> Option<String> + Send + Sync + 'static,
    {
        self.callbacks
            .write()
            .insert(name.into(), Arc::new(callback));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.callbacks.write().remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.callbacks.read().contains_key(name)
    }

    /// Emit a request; `None` when nobody answers.
    pub fn request(&self, name: &str, domain: &str, value: &Value) -> Option<String> {
        let callback = self.callbacks.read().get(name).cloned()?;
        log::debug!("[{domain}] Requesting \"{name}\" for {}", value.id());
        callback(domain, value)
    }

    pub(crate) fn stored_secret(&self, domain: &str, key: &str) -> Option<String> {
        self.secret_store.as_ref()?.get_secret(domain, key)
    }
}

impl fmt::Debug for Requests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.callbacks.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Requests")
            .field("callbacks", &names)
            .field("secret_store", &self.secret_store.is_some())
            .finish()
    }
}
