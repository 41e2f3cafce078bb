//! # scrapehub-module
//!
//! Framework shared by scraping backend modules: typed configuration values,
//! backend lifecycle, scoped storage and the object fill protocol.
//!
//! ## Concepts
//!
//! | Item | Role |
//! |------|------|
//! | [`Value`] | One typed, validated configuration field (text, int, bool, date, password...) |
//! | [`BackendConfig`] | Module schema, bound per instance with [`BackendConfig::load`] |
//! | [`BackendStorage`] | Key/value view scoped under `backends/<instance>` |
//! | [`Module`] | Code of a site adapter: descriptor, browser, fill handlers |
//! | [`Backend`] | Configured instance of a module, with a lazily built browser |
//! | [`Field`] | Attribute of a domain object that may be not loaded yet |
//!
//! ## Usage
//!
//! ```rust
//! use scrapehub_module::{
//!     Backend, BackendConfig, Context, Module, ModuleDescriptor, NoBrowser, Params, Value,
//!     caps::CAP_BANK,
//! };
//!
//! struct Bank {
//!     descriptor: ModuleDescriptor,
//! }
//!
//! impl Module for Bank {
//!     type Browser = NoBrowser;
//!
//!     fn descriptor(&self) -> &ModuleDescriptor {
//!         &self.descriptor
//!     }
//! }
//!
//! let module = Bank {
//!     descriptor: ModuleDescriptor::new("bank")
//!         .caps([CAP_BANK])
//!         .config(BackendConfig::schema([
//!             Value::new("login").label("Identifier"),
//!             Value::backend_password("password"),
//!         ])),
//! };
//!
//! let mut params = Params::new();
//! params.insert("login".to_string(), "bob".into());
//!
//! let backend = Backend::new(module, &Context::new(), "mybank", &params, None, None, false)?;
//! assert_eq!(backend.config()["login"].get_str()?, "bob");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Operations return [`Result<T, ModuleError>`](ModuleError). Configuration
//! problems surface as [`ConfigError`], carrying the instance, the field and
//! its description, so applications can re-prompt the operator.

mod backends_config;
mod browser;
pub mod caps;
mod config;
mod context;
mod error;
mod factory;
mod logger;
mod module;
mod object;
mod requests;
mod storage;
mod utils;
mod value;

// Re-export error types
pub use error::{ConfigError, ConfigErrorKind, ModuleError, Result, StoreError, ValueError};

// Re-export values and configuration
pub use config::{BackendConfig, Params, is_private_param};
pub use value::{
    DEFAULT_DATE_FORMAT, SecretSource, SecretStore, Setting, Value, ValueKind, ValuesDict,
    run_secret_command,
};

// Re-export collaborators
pub use backends_config::{
    BackendEntry, BackendsConfig, InMemoryBackendsConfig, MODULE_KEY, apply_add,
};
pub use context::Context;
pub use logger::{Logger, LoggerSettings};
pub use requests::{LOGIN_REQUEST, RequestCallback, Requests};
pub use storage::{BackendStorage, InMemoryStorage, Storage, StorageTree};

// Re-export runtime
pub use browser::{BROWSER_STATE_KEY, Browser, BrowserOptions, NoBrowser, ProxySettings};
pub use caps::Capability;
pub use factory::{ModuleLoader, loader, loader_with};
pub use module::{
    AnyBackend, Backend, BackendState, FillHandler, FillTable, Module, ModuleDescriptor,
};
pub use object::{BaseObject, Completeness, Field, FieldSlot, ObjectKind};

// Re-export utils
pub use utils::log_sanitizer;
