//! File-backed adapters for the CLI and other frontends.

mod fs;
mod json_backends_config;
mod json_storage;

#[cfg(feature = "keyring-store")]
mod keyring_secret_store;

pub use json_backends_config::JsonBackendsConfig;
pub use json_storage::JsonFileStorage;

#[cfg(feature = "keyring-store")]
pub use keyring_secret_store::KeyringSecretStore;
