//! Backend management service
//!
//! Adds, edits, removes and lists configured backend instances.

use std::sync::Arc;

use scrapehub_module::{BackendConfig, ConfigError, Params, is_private_param};

use crate::error::{CoreError, CoreResult};
use crate::services::{ServiceContext, Terminal, ValuePrompter};
use crate::types::BackendInfo;

/// Backend management service
pub struct BackendService {
    ctx: Arc<ServiceContext>,
}

impl BackendService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// First free instance name: `module`, then `module2`, `module3`...
    pub fn suggest_name(&self, module: &str) -> CoreResult<String> {
        let config = self.ctx.backends_config()?;
        if !config.backend_exists(module)? {
            return Ok(module.to_string());
        }
        let mut n = 2;
        loop {
            let candidate = format!("{module}{n}");
            if !config.backend_exists(&candidate)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Configure a new instance of `module` from `params` only.
    ///
    /// The instance is named `name`, or after the module when `None`.
    /// Returns the instance name.
    pub fn add_backend(&self, module: &str, name: Option<&str>, params: &Params) -> CoreResult<String> {
        self.add_with(module, name, params, |_, _| Ok(()))
    }

    /// Like [`add_backend`](Self::add_backend), prompting for every field
    /// missing from `params`.
    pub fn add_backend_interactive<T: Terminal>(
        &self,
        module: &str,
        name: Option<&str>,
        params: &Params,
        prompter: &mut ValuePrompter<T>,
    ) -> CoreResult<String> {
        self.add_with(module, name, params, |config, skip| {
            prompter.prompt_config(config, skip)
        })
    }

    /// Overlay `params` on a configured instance.
    pub fn edit_backend(&self, name: &str, params: &Params) -> CoreResult<()> {
        self.edit_with(name, params, |_, _| Ok(()))
    }

    /// Like [`edit_backend`](Self::edit_backend), prompting for every field
    /// missing from `params` with the stored values as defaults.
    pub fn edit_backend_interactive<T: Terminal>(
        &self,
        name: &str,
        params: &Params,
        prompter: &mut ValuePrompter<T>,
    ) -> CoreResult<()> {
        self.edit_with(name, params, |config, skip| prompter.prompt_config(config, skip))
    }

    /// Remove a configured instance, unloading it first when loaded.
    pub fn remove_backend(&self, name: &str) -> CoreResult<()> {
        if let Some(backend) = self.ctx.backend_registry.unregister(name) {
            if let Err(e) = backend.deinit() {
                log::warn!("[{name}] Deinit failed: {e}");
            }
        }
        if !self.ctx.backends_config()?.remove_backend(name)? {
            return Err(CoreError::BackendNotFound(name.to_string()));
        }
        log::info!("Backend \"{name}\" removed");
        Ok(())
    }

    /// Every configured instance, ordered by name.
    pub fn list_backends(&self) -> CoreResult<Vec<BackendInfo>> {
        let entries = self.ctx.backends_config()?.iter_backends()?;
        Ok(entries
            .iter()
            .map(|entry| {
                let loader = self.ctx.module_registry.get(&entry.module);
                let loaded = self.ctx.backend_registry.get(&entry.name).is_some();
                BackendInfo::new(entry, loader.as_ref().map(|l| l.descriptor()), loaded)
            })
            .collect())
    }

    /// Bind the stored configuration of an instance strictly, reporting the
    /// first missing or invalid field.
    pub fn check_backend_config(&self, name: &str) -> CoreResult<()> {
        let entry = self.ctx.backends_config()?.get_backend(name)?;
        let loader = self.ctx.get_module(&entry.module)?;
        loader
            .descriptor()
            .config
            .load(&self.ctx.module_ctx, &entry.module, name, &entry.params, false)?;
        Ok(())
    }

    fn add_with<F>(&self, module: &str, name: Option<&str>, params: &Params, prompt: F) -> CoreResult<String>
    where
        F: FnOnce(&mut BackendConfig, &[String]) -> CoreResult<()>,
    {
        let loader = self.ctx.get_module(module)?;
        let name = match name {
            Some(n) => n.to_string(),
            None => self.suggest_name(module)?,
        };
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Please give a name to the configured backend".to_string(),
            ));
        }
        if self.ctx.backends_config()?.backend_exists(&name)? {
            return Err(CoreError::BackendAlreadyExists(name));
        }

        let schema = &loader.descriptor().config;
        let mut config = schema.load(&self.ctx.module_ctx, module, &name, &Params::new(), true)?;
        let supplied = self.apply_params(&mut config, &name, params)?;
        prompt(&mut config, &supplied)?;

        self.save(schema, module, &name, &config, &private_params(params), false)?;
        log::info!("Backend \"{name}\" added for module \"{module}\"");
        Ok(name)
    }

    fn edit_with<F>(&self, name: &str, params: &Params, prompt: F) -> CoreResult<()>
    where
        F: FnOnce(&mut BackendConfig, &[String]) -> CoreResult<()>,
    {
        let entry = self.ctx.backends_config()?.get_backend(name)?;
        let loader = self.ctx.get_module(&entry.module)?;
        let schema = &loader.descriptor().config;
        if schema.is_empty() && params.is_empty() {
            return Err(CoreError::NotConfigurable(entry.module));
        }

        let mut config = schema.load(&self.ctx.module_ctx, &entry.module, name, &entry.params, true)?;
        let supplied = self.apply_params(&mut config, name, params)?;
        prompt(&mut config, &supplied)?;

        let mut extra = private_params(&entry.params);
        extra.extend(private_params(params));
        self.save(schema, &entry.module, name, &config, &extra, true)?;
        log::info!("Backend \"{name}\" edited");
        Ok(())
    }

    /// Load supplied schema fields into `config`; returns their ids.
    fn apply_params(&self, config: &mut BackendConfig, name: &str, params: &Params) -> CoreResult<Vec<String>> {
        let requests = self.ctx.module_ctx.requests();
        let mut supplied = Vec::new();

        for (key, raw) in params {
            if is_private_param(key) {
                continue;
            }
            let Some(value) = config.get_mut(key) else {
                return Err(CoreError::ValidationError(format!(
                    "Unknown parameter \"{key}\""
                )));
            };
            let description = value.description_text().map(str::to_string);
            if let Err(e) = value.load(name, raw.clone(), requests) {
                return Err(ConfigError::invalid(name, key.as_str(), description, e).into());
            }
            supplied.push(key.clone());
        }
        Ok(supplied)
    }

    /// Bind the final parameters strictly, then persist them.
    fn save(
        &self,
        schema: &BackendConfig,
        module: &str,
        name: &str,
        config: &BackendConfig,
        extra: &Params,
        edit: bool,
    ) -> CoreResult<()> {
        let mut params = config.dump();
        params.extend(extra.clone());
        let checked = schema.load(&self.ctx.module_ctx, module, name, &params, false)?;
        checked.save(edit, Some(extra))?;
        Ok(())
    }
}

fn private_params(params: &Params) -> Params {
    params
        .iter()
        .filter(|(k, _)| is_private_param(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ModuleError;
    use crate::test_utils::{ScriptedTerminal, bank_params, create_test_context, params};
    use scrapehub_module::{BackendsConfig, ConfigErrorKind};

    #[test]
    fn add_with_params() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);

        let mut input = bank_params();
        input.insert("_proxy".to_string(), json!("http://proxy"));
        let name = svc.add_backend("testbank", None, &input).unwrap();
        assert_eq!(name, "testbank");

        let entry = store.get_backend("testbank").unwrap();
        assert_eq!(entry.module, "testbank");
        assert_eq!(entry.params["login"], json!("bob"));
        assert_eq!(entry.params["_proxy"], json!("http://proxy"));
        assert_eq!(entry.params["website"], json!("par"));
    }

    #[test]
    fn suggested_names() {
        let (ctx, _) = create_test_context();
        let svc = BackendService::new(ctx);
        assert_eq!(svc.add_backend("testbank", None, &bank_params()).unwrap(), "testbank");
        assert_eq!(svc.add_backend("testbank", None, &bank_params()).unwrap(), "testbank2");
        assert_eq!(svc.add_backend("testbank", None, &bank_params()).unwrap(), "testbank3");
    }

    #[test]
    fn add_rejects_existing_and_unknown() {
        let (ctx, _) = create_test_context();
        let svc = BackendService::new(ctx);
        svc.add_backend("testbank", Some("mine"), &bank_params()).unwrap();

        assert!(matches!(
            svc.add_backend("testbank", Some("mine"), &bank_params()),
            Err(CoreError::BackendAlreadyExists(_))
        ));
        assert!(matches!(
            svc.add_backend("nope", None, &Params::new()),
            Err(CoreError::ModuleNotFound(_))
        ));
        assert!(matches!(
            svc.add_backend("testbank", None, &params(&[("color", json!("red"))])),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn add_reports_missing_field() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        let err = svc.add_backend("testbank", None, &Params::new()).unwrap_err();
        let CoreError::Module(ModuleError::Config(config)) = err else {
            panic!("expected a configuration error, got {err}");
        };
        assert_eq!(config.field, "login");
        assert_eq!(config.kind, ConfigErrorKind::Missing);
        assert!(store.iter_backends().unwrap().is_empty());
    }

    #[test]
    fn add_reports_invalid_field() {
        let (ctx, _) = create_test_context();
        let svc = BackendService::new(ctx);
        let err = svc
            .add_backend("testbank", None, &params(&[("login", json!("bob")), ("website", json!("xx"))]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Module(ModuleError::Config(ConfigError { ref field, .. })) if field == "website"
        ));
    }

    #[test]
    fn add_interactive_prompts_missing_fields() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        // website menu, then password storage choice (prompt when needed)
        let mut prompter = ValuePrompter::new(ScriptedTerminal::new(&["2", "p"]));
        svc.add_backend_interactive("testbank", None, &params(&[("login", json!("bob"))]), &mut prompter)
            .unwrap();

        let entry = store.get_backend("testbank").unwrap();
        assert_eq!(entry.params["website"], json!("pro"));
        assert_eq!(entry.params["password"], json!(""));
        assert!(!prompter.terminal().output().contains("Identifier"));
    }

    #[test]
    fn edit_overlays_and_keeps_private() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        let mut input = bank_params();
        input.insert("_proxy".to_string(), json!("http://proxy"));
        svc.add_backend("testbank", Some("b"), &input).unwrap();

        svc.edit_backend("b", &params(&[("website", json!("pro"))])).unwrap();
        let entry = store.get_backend("b").unwrap();
        assert_eq!(entry.params["website"], json!("pro"));
        assert_eq!(entry.params["login"], json!("bob"));
        assert_eq!(entry.params["_proxy"], json!("http://proxy"));

        assert!(matches!(
            svc.edit_backend("missing", &Params::new()),
            Err(CoreError::BackendNotFound(_))
        ));
    }

    #[test]
    fn edit_interactive_uses_stored_values() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        svc.add_backend("testbank", Some("b"), &bank_params()).unwrap();

        // keep login, keep website, store a new password
        let mut prompter = ValuePrompter::new(ScriptedTerminal::new(&["", "", "s", "hunter2"]));
        svc.edit_backend_interactive("b", &Params::new(), &mut prompter)
            .unwrap();
        let entry = store.get_backend("b").unwrap();
        assert_eq!(entry.params["login"], json!("bob"));
        assert_eq!(entry.params["password"], json!("hunter2"));
        assert!(prompter.terminal().output().contains("[bob]"));
    }

    #[test]
    fn edit_unconfigurable_module() {
        let (ctx, store) = create_test_context();
        store.add_backend("feeds", "testnews", &Params::new(), false).unwrap();
        let svc = BackendService::new(ctx);
        assert!(svc.edit_backend("feeds", &Params::new()).is_ok());

        store.add_backend("plain", "testplain", &Params::new(), false).unwrap();
        assert!(matches!(
            svc.edit_backend("plain", &Params::new()),
            Err(CoreError::NotConfigurable(_))
        ));
    }

    #[test]
    fn remove_and_list() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        svc.add_backend("testbank", Some("a"), &bank_params()).unwrap();
        store.add_backend("ghost", "unknown", &Params::new(), false).unwrap();

        let list = svc.list_backends().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "a");
        assert!(list[0].module_available);
        assert!(!list[1].module_available);

        svc.remove_backend("a").unwrap();
        assert!(matches!(
            svc.remove_backend("a"),
            Err(CoreError::BackendNotFound(_))
        ));
        assert_eq!(svc.list_backends().unwrap().len(), 1);
    }

    #[test]
    fn check_config() {
        let (ctx, store) = create_test_context();
        let svc = BackendService::new(ctx);
        store.add_backend("ok", "testbank", &bank_params(), false).unwrap();
        store.add_backend("bad", "testbank", &Params::new(), false).unwrap();

        assert!(svc.check_backend_config("ok").is_ok());
        assert!(matches!(
            svc.check_backend_config("bad"),
            Err(CoreError::Module(ModuleError::Config(_)))
        ));
    }
}
