//! Named loggers handed to backends and browsers.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

/// Application-wide logging options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerSettings {
    /// When set, browsers dump HTTP responses under this directory, one
    /// subdirectory per backend.
    pub responses_dirname: Option<PathBuf>,
}

/// Named handle over the `log` facade.
///
/// Records are prefixed with `[name]`; children are named `parent.child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: String,
    settings: Arc<LoggerSettings>,
}

impl Logger {
    pub fn new(name: impl Into<String>, settings: Arc<LoggerSettings>) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// Logger named `name`, below `parent` when given.
    pub fn get(name: &str, parent: Option<&Self>, settings: Arc<LoggerSettings>) -> Self {
        match parent {
            Some(parent) => parent.child(name),
            None => Self::new(name, settings),
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: format!("{}.{name}", self.name),
            settings: Arc::clone(&self.settings),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    pub fn debug(&self, msg: impl Display) {
        log::debug!("[{}] {msg}", self.name);
    }

    pub fn info(&self, msg: impl Display) {
        log::info!("[{}] {msg}", self.name);
    }

    pub fn warn(&self, msg: impl Display) {
        log::warn!("[{}] {msg}", self.name);
    }

    pub fn error(&self, msg: impl Display) {
        log::error!("[{}] {msg}", self.name);
    }
}
