//! Contract between backends and the browsers they drive.
//!
//! The browser itself (HTTP session, page parsing) belongs to each module;
//! the framework only builds it once with the options below and persists its
//! state.

use std::path::PathBuf;

use serde_json::Value as RawValue;

use crate::config::Params;
use crate::logger::Logger;

/// Storage key holding the dumped browser state of a backend.
pub const BROWSER_STATE_KEY: &str = "browser_state";

/// A module browser.
///
/// Browsers are shared behind the backend; mutable session data needs
/// interior mutability, and callers serialize multi-call sequences with
/// [`Backend::lock`](crate::module::Backend::lock).
pub trait Browser: Send + Sync + 'static {
    /// Restore state saved by a previous session; `{}` when none was saved.
    fn load_state(&mut self, _state: &RawValue) {}

    /// State to persist on deinit; `None` when the browser keeps none.
    fn dump_state(&self) -> Option<RawValue> {
        None
    }
}

/// Browser type of modules that do not need one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

impl Browser for NoBrowser {}

/// Proxy URLs per scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxySettings {
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

/// Everything a module needs to construct its browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub proxy: ProxySettings,
    pub logger: Logger,
    /// Directory where responses are dumped, when enabled.
    pub responses_dirname: Option<PathBuf>,
    /// Highlight matched elements in dumped pages.
    pub highlight_el: Option<bool>,
    /// Module-specific arguments given to `create_browser`.
    pub params: Params,
}
