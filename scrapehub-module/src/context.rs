//! Application context shared by every backend.

use std::fmt;
use std::sync::Arc;

use crate::backends_config::BackendsConfig;
use crate::error::StoreError;
use crate::logger::LoggerSettings;
use crate::requests::Requests;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Collaborators the framework reaches through the application.
#[derive(Clone)]
pub struct Context {
    requests: Requests,
    backends_config: Option<Arc<dyn BackendsConfig>>,
    logger_settings: Arc<LoggerSettings>,
    env: EnvLookup,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            requests: Requests::new(),
            backends_config: None,
            logger_settings: Arc::default(),
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_requests(mut self, requests: Requests) -> Self {
        self.requests = requests;
        self
    }

    #[must_use]
    pub fn with_backends_config(mut self, config: Arc<dyn BackendsConfig>) -> Self {
        self.backends_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_logger_settings(mut self, settings: LoggerSettings) -> Self {
        self.logger_settings = Arc::new(settings);
        self
    }

    /// Replace the process environment lookup, e.g. for proxy variables.
    #[must_use]
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    pub fn requests(&self) -> &Requests {
        &self.requests
    }

    pub fn backends_config(&self) -> Result<&Arc<dyn BackendsConfig>, StoreError> {
        self.backends_config
            .as_ref()
            .ok_or_else(|| StoreError::NotAttached("backends config".to_string()))
    }

    pub fn logger_settings(&self) -> &Arc<LoggerSettings> {
        &self.logger_settings
    }

    /// Environment variable, empty values counting as unset.
    pub fn env_var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("requests", &self.requests)
            .field("backends_config", &self.backends_config.is_some())
            .field("logger_settings", &self.logger_settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override() {
        let ctx = Context::new().with_env(|name| match name {
            "http_proxy" => Some("http://proxy:3128".to_string()),
            "HTTPS_PROXY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(ctx.env_var("http_proxy").as_deref(), Some("http://proxy:3128"));
        assert_eq!(ctx.env_var("HTTPS_PROXY"), None);
        assert_eq!(ctx.env_var("PATH"), None);
    }

    #[test]
    fn missing_backends_config() {
        let ctx = Context::new();
        assert!(matches!(
            ctx.backends_config(),
            Err(StoreError::NotAttached(_))
        ));
    }
}
