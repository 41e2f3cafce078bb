//! Keyring-based secret store.
//!
//! Uses the system keychain (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service) via the `keyring` crate. One entry per backend
//! password, keyed `<instance>/<field>`.

use keyring::Entry;

use scrapehub_module::{SecretStore, StoreError};

const SERVICE_NAME: &str = "scrapehub";

/// Keyring-based secret store.
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Store under another keychain service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, domain: &str, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, &format!("{domain}/{key}"))
            .map_err(|e| StoreError::Io {
                path: format!("keyring:{}", self.service),
                detail: e.to_string(),
            })
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn get_secret(&self, domain: &str, key: &str) -> Option<String> {
        let entry = self.entry(domain, key).ok()?;
        match entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                log::warn!("[{domain}] Unable to read \"{key}\" from keyring: {e}");
                None
            }
        }
    }

    fn set_secret(&self, domain: &str, key: &str, secret: &str) -> Result<(), StoreError> {
        self.entry(domain, key)?
            .set_password(secret)
            .map_err(|e| StoreError::Io {
                path: format!("keyring:{}", self.service),
                detail: e.to_string(),
            })?;
        log::debug!("[{domain}] Stored \"{key}\" in keyring");
        Ok(())
    }

    fn delete_secret(&self, domain: &str, key: &str) -> Result<(), StoreError> {
        match self.entry(domain, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Io {
                path: format!("keyring:{}", self.service),
                detail: e.to_string(),
            }),
        }
    }
}
