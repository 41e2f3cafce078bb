//! Module descriptors and the backend runtime.
//!
//! A [`Module`] is the code of a site adapter; a [`Backend`] is one
//! configured instance of it, owning a bound configuration, a scoped storage
//! and a lazily built browser.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use serde::Serialize;
use serde_json::{Value as RawValue, json};

use crate::browser::{BROWSER_STATE_KEY, Browser, BrowserOptions, ProxySettings};
use crate::caps::{CapQuery, Capability, flatten_caps, has_any_cap};
use crate::config::{BackendConfig, Params, is_private_param};
use crate::context::Context;
use crate::error::{ModuleError, Result};
use crate::logger::Logger;
use crate::object::{BaseObject, ObjectKind};
use crate::storage::{BackendStorage, Storage};

/// Static metadata of a module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub maintainer: String,
    pub email: String,
    pub version: String,
    pub description: String,
    pub license: String,
    pub caps: Vec<Capability>,
    /// Configuration schema.
    pub config: BackendConfig,
    /// Default storage tree of each instance.
    pub storage: RawValue,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            maintainer: String::new(),
            email: String::new(),
            version: String::new(),
            description: String::new(),
            license: String::new(),
            caps: Vec::new(),
            config: BackendConfig::default(),
            storage: json!({}),
        }
    }

    #[must_use]
    pub fn maintainer(mut self, maintainer: impl Into<String>, email: impl Into<String>) -> Self {
        self.maintainer = maintainer.into();
        self.email = email.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    #[must_use]
    pub fn caps(mut self, caps: impl IntoIterator<Item = Capability>) -> Self {
        self.caps = caps.into_iter().collect();
        self
    }

    #[must_use]
    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn storage(mut self, default_tree: RawValue) -> Self {
        self.storage = default_tree;
        self
    }

    /// Declared capabilities and their ancestors.
    pub fn iter_caps(&self) -> Vec<Capability> {
        flatten_caps(&self.caps)
    }

    pub fn has_caps<Q: CapQuery>(&self, queries: &[Q]) -> bool {
        has_any_cap(&self.caps, queries)
    }
}

/// Fill handler: completes the `fields` of `obj`, in place.
pub type FillHandler<M> =
    Box<dyn Fn(&Backend<M>, &mut dyn BaseObject, &[String]) -> Result<()> + Send + Sync>;

/// Ordered `(kind, handler)` table; the first kind the object has wins.
pub struct FillTable<M: Module> {
    entries: Vec<(ObjectKind, FillHandler<M>)>,
}

impl<M: Module> Default for FillTable<M> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<M: Module> FillTable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler filling objects of `kind`.
    ///
    /// Name the module when building the table (`FillTable::<Self>::new()`)
    /// so that handlers can use the backend browser type.
    #[must_use]
    pub fn with<F>(mut self, kind: ObjectKind, handler: F) -> Self
    where
        F: Fn(&Backend<M>, &mut dyn BaseObject, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.entries.push((kind, Box::new(handler)));
        self
    }

    pub fn find(&self, obj: &dyn BaseObject) -> Option<&FillHandler<M>> {
        self.entries
            .iter()
            .find(|(kind, _)| obj.is_kind(*kind))
            .map(|(_, handler)| handler)
    }

    pub fn kinds(&self) -> Vec<ObjectKind> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Code of a site adapter.
///
/// Hooks taking `&Backend<Self>` can be overridden to customize how the
/// instance builds its browser or shuts down.
pub trait Module: Send + Sync + Sized + 'static {
    type Browser: Browser;

    fn descriptor(&self) -> &ModuleDescriptor;

    /// Construct the browser; `None` for modules without one.
    fn build_browser(&self, _options: BrowserOptions) -> Result<Option<Self::Browser>> {
        Ok(None)
    }

    /// Browser built on first access, usually with credentials from the
    /// configuration.
    fn create_default_browser(backend: &Backend<Self>) -> Result<Option<Self::Browser>> {
        backend.create_browser(Params::new())
    }

    /// Fill handlers of the module objects.
    fn objects(&self) -> FillTable<Self> {
        FillTable::new()
    }

    /// Called by [`Backend::deinit`] before the browser state is saved.
    fn deinit(_backend: &Backend<Self>) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle of a backend.
///
/// A backend only exists once its configuration is bound, so the first
/// observable state is [`BackendState::BrowserLazy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendState {
    BrowserLazy,
    BrowserActive,
    Deinitialized,
}

/// A configured instance of module `M`.
pub struct Backend<M: Module> {
    module: M,
    ctx: Context,
    name: String,
    logger: Logger,
    config: BackendConfig,
    private_config: Params,
    storage: BackendStorage,
    objects: FillTable<M>,
    browser: OnceLock<Option<M::Browser>>,
    deinitialized: AtomicBool,
    lock: ReentrantMutex<()>,
}

impl<M: Module> Backend<M> {
    /// Bind the configuration and load the default storage tree.
    ///
    /// The browser is not built here.
    pub fn new(
        module: M,
        ctx: &Context,
        name: &str,
        params: &Params,
        storage: Option<Arc<dyn Storage>>,
        parent_logger: Option<&Logger>,
        nofail: bool,
    ) -> Result<Self> {
        let logger = Logger::get(name, parent_logger, Arc::clone(ctx.logger_settings()));

        let private_config: Params = params
            .iter()
            .filter(|(k, _)| is_private_param(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let descriptor = module.descriptor();
        let config = descriptor
            .config
            .load(ctx, &descriptor.name, name, params, nofail)?;

        let storage = BackendStorage::new(name, storage);
        storage.load(descriptor.storage.clone())?;

        let objects = module.objects();
        logger.debug(format_args!(
            "Backend of module {} created",
            descriptor.name
        ));

        Ok(Self {
            module,
            ctx: ctx.clone(),
            name: name.to_string(),
            logger,
            config,
            private_config,
            storage,
            objects,
            browser: OnceLock::new(),
            deinitialized: AtomicBool::new(false),
            lock: ReentrantMutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        self.module.descriptor()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Private `_` parameters of the instance.
    pub fn private_config(&self) -> &Params {
        &self.private_config
    }

    pub fn storage(&self) -> &BackendStorage {
        &self.storage
    }

    /// Re-entrant lock serializing use of the browser across callers.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub fn state(&self) -> BackendState {
        if self.deinitialized.load(Ordering::SeqCst) {
            BackendState::Deinitialized
        } else if self.browser.get().is_some() {
            BackendState::BrowserActive
        } else {
            BackendState::BrowserLazy
        }
    }

    pub fn iter_caps(&self) -> Vec<Capability> {
        self.descriptor().iter_caps()
    }

    pub fn has_caps<Q: CapQuery>(&self, queries: &[Q]) -> bool {
        self.descriptor().has_caps(queries)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.deinitialized.load(Ordering::SeqCst) {
            return Err(ModuleError::Deinitialized(self.name.clone()));
        }
        Ok(())
    }

    /// The browser, built on first access with
    /// [`Module::create_default_browser`].
    pub fn browser(&self) -> Result<Option<&M::Browser>> {
        self.ensure_active()?;
        if let Some(browser) = self.browser.get() {
            return Ok(browser.as_ref());
        }

        let _guard = self.lock.lock();
        if let Some(browser) = self.browser.get() {
            return Ok(browser.as_ref());
        }
        let browser = M::create_default_browser(self)?;
        let browser = self.browser.get_or_init(|| browser);
        Ok(browser.as_ref())
    }

    fn private_str(&self, key: &str) -> Option<String> {
        match self.private_config.get(key)? {
            RawValue::String(s) if s.is_empty() => None,
            RawValue::String(s) => Some(s.clone()),
            RawValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Proxy from the `_proxy`/`_proxy_ssl` parameters, then the
    /// `http(s)_proxy` and `HTTP(S)_PROXY` environment variables.
    pub fn proxy_settings(&self) -> ProxySettings {
        ProxySettings {
            http: self
                .private_str("_proxy")
                .or_else(|| self.ctx.env_var("http_proxy"))
                .or_else(|| self.ctx.env_var("HTTP_PROXY")),
            https: self
                .private_str("_proxy_ssl")
                .or_else(|| self.ctx.env_var("https_proxy"))
                .or_else(|| self.ctx.env_var("HTTPS_PROXY")),
        }
    }

    fn responses_dirname(&self) -> Option<PathBuf> {
        let debug_dir = self.private_str("_debug_dir");
        match &self.logger.settings().responses_dirname {
            Some(root) => Some(root.join(debug_dir.as_deref().unwrap_or(&self.name))),
            None => debug_dir
                .filter(|d| Path::new(d).is_absolute())
                .map(PathBuf::from),
        }
    }

    fn highlight_el(&self) -> Option<bool> {
        let raw = self.private_config.get("_highlight_el")?;
        match raw {
            RawValue::Bool(b) => Some(*b),
            RawValue::Number(n) => Some(n.as_i64().unwrap_or_default() != 0),
            RawValue::String(s) if !s.is_empty() => Some(s.trim().parse::<i64>().is_ok_and(|n| n != 0)),
            _ => None,
        }
    }

    /// Build a new browser with the instance options and restore its
    /// saved state. Does not cache it; see [`Backend::browser`].
    pub fn create_browser(&self, params: Params) -> Result<Option<M::Browser>> {
        self.ensure_active()?;
        let options = BrowserOptions {
            proxy: self.proxy_settings(),
            logger: self.logger.child("browser"),
            responses_dirname: self.responses_dirname(),
            highlight_el: self.highlight_el(),
            params,
        };
        if !options.proxy.is_empty() {
            self.logger.debug(format_args!(
                "Using proxy http={} https={}",
                options.proxy.http.as_deref().unwrap_or("-"),
                options.proxy.https.as_deref().unwrap_or("-")
            ));
        }

        let Some(mut browser) = self.module.build_browser(options)? else {
            return Ok(None);
        };
        let state = self.storage.get(&[BROWSER_STATE_KEY], json!({}));
        browser.load_state(&state);
        Ok(Some(browser))
    }

    /// Save the browser state to storage, when a browser was built and keeps
    /// some.
    pub fn dump_state(&self) -> Result<()> {
        let Some(Some(browser)) = self.browser.get() else {
            return Ok(());
        };
        if let Some(state) = browser.dump_state() {
            self.storage.set(&[BROWSER_STATE_KEY], state)?;
            self.storage.save()?;
            self.logger.debug("Browser state saved");
        }
        Ok(())
    }

    /// Run the module hook and save the browser state. The backend is
    /// unusable afterwards; calling it again does nothing.
    pub fn deinit(&self) -> Result<()> {
        let _guard = self.lock.lock();
        if self.deinitialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        M::deinit(self)?;
        self.dump_state()?;
        self.deinitialized.store(true, Ordering::SeqCst);
        self.logger.debug("Backend deinitialized");
        Ok(())
    }

    /// Complete the requested fields of `obj` (all fields when `None`).
    ///
    /// Fields still not loaded after the module handler ran, or when no
    /// handler matches, become `NotAvailable`. Naming a field the object does
    /// not declare is an error.
    pub fn fill(&self, obj: &mut dyn BaseObject, fields: Option<&[&str]>) -> Result<()> {
        let requested: Vec<&str> = match fields {
            Some(fields) => fields.to_vec(),
            None => obj.field_names().to_vec(),
        };

        let mut missing = Vec::new();
        for name in requested {
            let slot = obj.field(name).ok_or_else(|| ModuleError::FieldNotFound {
                object: obj.fullid(),
                field: name.to_string(),
            })?;
            if slot.is_incomplete() {
                missing.push(name.to_string());
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        if let Some(handler) = self.objects.find(obj) {
            self.logger.debug(format_args!(
                "Fill {} with fields: {}",
                obj.fullid(),
                missing.join(", ")
            ));
            handler(self, &mut *obj, &missing)?;
        }

        for name in &missing {
            if let Some(slot) = obj.field_mut(name) {
                slot.set_not_available();
            }
        }
        Ok(())
    }

    /// Owned form of [`Backend::fill`].
    pub fn fillobj<O: BaseObject>(&self, mut obj: O, fields: Option<&[&str]>) -> Result<O> {
        self.fill(&mut obj, fields)?;
        Ok(obj)
    }
}

impl<M: Module> std::fmt::Debug for Backend<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("module", &self.descriptor().name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Type-erased backend, for registries holding backends of many modules.
pub trait AnyBackend: Send + Sync {
    fn name(&self) -> &str;

    fn module_name(&self) -> &str;

    fn descriptor(&self) -> &ModuleDescriptor;

    fn iter_caps(&self) -> Vec<Capability>;

    fn config(&self) -> &BackendConfig;

    fn storage(&self) -> &BackendStorage;

    fn state(&self) -> BackendState;

    fn lock(&self) -> ReentrantMutexGuard<'_, ()>;

    fn fill(&self, obj: &mut dyn BaseObject, fields: Option<&[&str]>) -> Result<()>;

    fn dump_state(&self) -> Result<()>;

    fn deinit(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn AnyBackend {
    pub fn has_caps<Q: CapQuery>(&self, queries: &[Q]) -> bool {
        self.descriptor().has_caps(queries)
    }

    /// Concrete backend, when it runs module `M`.
    pub fn downcast_ref<M: Module>(&self) -> Option<&Backend<M>> {
        self.as_any().downcast_ref::<Backend<M>>()
    }
}

impl<M: Module> AnyBackend for Backend<M> {
    fn name(&self) -> &str {
        Backend::name(self)
    }

    fn module_name(&self) -> &str {
        &self.descriptor().name
    }

    fn descriptor(&self) -> &ModuleDescriptor {
        Backend::descriptor(self)
    }

    fn iter_caps(&self) -> Vec<Capability> {
        Backend::iter_caps(self)
    }

    fn config(&self) -> &BackendConfig {
        Backend::config(self)
    }

    fn storage(&self) -> &BackendStorage {
        Backend::storage(self)
    }

    fn state(&self) -> BackendState {
        Backend::state(self)
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        Backend::lock(self)
    }

    fn fill(&self, obj: &mut dyn BaseObject, fields: Option<&[&str]>) -> Result<()> {
        Backend::fill(self, obj, fields)
    }

    fn dump_state(&self) -> Result<()> {
        Backend::dump_state(self)
    }

    fn deinit(&self) -> Result<()> {
        Backend::deinit(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::caps::{CAP_BANK, CAP_BANK_WEALTH, CAP_MESSAGES};
    use crate::logger::LoggerSettings;
    use crate::object::Field;
    use crate::storage::InMemoryStorage;
    use crate::value::Value;

    const KIND_ACCOUNT: ObjectKind = ObjectKind::new("Account");
    const KIND_INVESTMENT: ObjectKind = ObjectKind::new("Investment");
    const KIND_TRANSFER: ObjectKind = ObjectKind::new("Transfer");

    #[derive(Debug, Default)]
    struct Account {
        id: String,
        a: Field<i64>,
        b: Field<i64>,
    }

    crate::impl_base_object!(Account, id: id, kinds: [KIND_ACCOUNT], fields: [a, b]);

    #[derive(Debug, Default)]
    struct Transfer {
        id: String,
        amount: Field<i64>,
    }

    crate::impl_base_object!(Transfer, id: id, kinds: [KIND_TRANSFER], fields: [amount]);

    #[derive(Debug)]
    struct FakeBrowser {
        options: BrowserOptions,
        state: Mutex<RawValue>,
    }

    impl Browser for FakeBrowser {
        fn load_state(&mut self, state: &RawValue) {
            *self.state.get_mut() = state.clone();
        }

        fn dump_state(&self) -> Option<RawValue> {
            Some(json!({"cookie": "abc"}))
        }
    }

    struct FakeModule {
        descriptor: ModuleDescriptor,
        builds: Arc<AtomicUsize>,
    }

    impl FakeModule {
        fn new() -> Self {
            Self {
                descriptor: ModuleDescriptor::new("fakebank")
                    .maintainer("Jane", "jane@example.org")
                    .version("1.0")
                    .caps([CAP_BANK_WEALTH])
                    .config(BackendConfig::schema([
                        Value::new("login"),
                        Value::backend_password("password"),
                    ]))
                    .storage(json!({"seen": []})),
                builds: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Module for FakeModule {
        type Browser = FakeBrowser;

        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        fn build_browser(&self, options: BrowserOptions) -> Result<Option<FakeBrowser>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Some(FakeBrowser {
                options,
                state: Mutex::new(RawValue::Null),
            }))
        }

        fn objects(&self) -> FillTable<Self> {
            FillTable::<Self>::new()
                .with(KIND_INVESTMENT, |_, _, _| Ok(()))
                .with(KIND_ACCOUNT, |_, obj, fields| {
                    if let Some(account) = obj.as_any_mut().downcast_mut::<Account>()
                        && fields.iter().any(|f| f == "a")
                    {
                        account.a = Field::Loaded(7);
                    }
                    Ok(())
                })
        }
    }

    fn params(pairs: &[(&str, RawValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn backend_with(ctx: &Context, extra: &[(&str, RawValue)]) -> Backend<FakeModule> {
        let mut p = params(&[("login", json!("bob"))]);
        p.extend(params(extra));
        Backend::new(FakeModule::new(), ctx, "bank", &p, None, None, false).unwrap()
    }

    fn quiet_env() -> Context {
        Context::new().with_env(|_| None)
    }

    #[test]
    fn construction_does_not_build_browser() {
        let backend = backend_with(&quiet_env(), &[]);
        assert_eq!(backend.state(), BackendState::BrowserLazy);
        assert_eq!(backend.module().builds.load(Ordering::SeqCst), 0);
        assert_eq!(backend.config()["login"].get_str().unwrap(), "bob");
    }

    #[test]
    fn missing_config_fails_construction() {
        let res = Backend::new(
            FakeModule::new(),
            &quiet_env(),
            "bank",
            &Params::new(),
            None,
            None,
            false,
        );
        assert!(matches!(res, Err(ModuleError::Config(_))));
    }

    #[test]
    fn browser_built_once() {
        let backend = backend_with(&quiet_env(), &[]);
        assert!(backend.browser().unwrap().is_some());
        assert!(backend.browser().unwrap().is_some());
        assert_eq!(backend.module().builds.load(Ordering::SeqCst), 1);
        assert_eq!(backend.state(), BackendState::BrowserActive);
    }

    #[test]
    fn private_proxy_wins_over_env() {
        let ctx = Context::new().with_env(|name| match name {
            "http_proxy" => Some("http://env-lower".to_string()),
            "HTTP_PROXY" => Some("http://env-upper".to_string()),
            "HTTPS_PROXY" => Some("http://env-ssl".to_string()),
            _ => None,
        });

        let backend = backend_with(&ctx, &[("_proxy", json!("http://private"))]);
        let proxy = backend.proxy_settings();
        assert_eq!(proxy.http.as_deref(), Some("http://private"));
        assert_eq!(proxy.https.as_deref(), Some("http://env-ssl"));

        let backend = backend_with(&ctx, &[]);
        assert_eq!(
            backend.proxy_settings().http.as_deref(),
            Some("http://env-lower")
        );
    }

    #[test]
    fn no_proxy() {
        let backend = backend_with(&quiet_env(), &[]);
        assert!(backend.proxy_settings().is_empty());
    }

    #[test]
    fn browser_options() {
        let ctx = quiet_env().with_logger_settings(LoggerSettings {
            responses_dirname: Some(PathBuf::from("/tmp/responses")),
        });
        let backend = backend_with(&ctx, &[("_highlight_el", json!("1"))]);
        let browser = backend.browser().unwrap().unwrap();
        assert_eq!(
            browser.options.responses_dirname,
            Some(PathBuf::from("/tmp/responses/bank"))
        );
        assert_eq!(browser.options.highlight_el, Some(true));
        assert_eq!(browser.options.logger.name(), "bank.browser");

        let backend = backend_with(&ctx, &[("_debug_dir", json!("custom"))]);
        assert_eq!(
            backend.responses_dirname(),
            Some(PathBuf::from("/tmp/responses/custom"))
        );
    }

    #[test]
    fn absolute_debug_dir_without_settings() {
        let backend = backend_with(&quiet_env(), &[("_debug_dir", json!("/var/dump"))]);
        assert_eq!(backend.responses_dirname(), Some(PathBuf::from("/var/dump")));

        let backend = backend_with(&quiet_env(), &[("_debug_dir", json!("relative"))]);
        assert_eq!(backend.responses_dirname(), None);
    }

    #[test]
    fn browser_state_round_trip() {
        let store: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let p = params(&[("login", json!("bob"))]);
        let ctx = quiet_env();

        let backend =
            Backend::new(FakeModule::new(), &ctx, "bank", &p, Some(Arc::clone(&store)), None, false)
                .unwrap();
        assert_eq!(backend.storage().get(&["seen"], RawValue::Null), json!([]));
        backend.browser().unwrap();
        backend.deinit().unwrap();
        assert_eq!(backend.state(), BackendState::Deinitialized);
        assert!(matches!(backend.browser(), Err(ModuleError::Deinitialized(_))));
        backend.deinit().unwrap();

        let backend =
            Backend::new(FakeModule::new(), &ctx, "bank", &p, Some(store), None, false).unwrap();
        let browser = backend.browser().unwrap().unwrap();
        assert_eq!(*browser.state.lock(), json!({"cookie": "abc"}));
    }

    #[test]
    fn deinit_without_browser_saves_nothing() {
        let store = Arc::new(InMemoryStorage::new());
        let backend = Backend::new(
            FakeModule::new(),
            &quiet_env(),
            "bank",
            &params(&[("login", json!("bob"))]),
            Some(Arc::clone(&store) as Arc<dyn Storage>),
            None,
            false,
        )
        .unwrap();
        backend.deinit().unwrap();
        assert_eq!(
            store.get(&["backends", "bank", BROWSER_STATE_KEY], RawValue::Null),
            RawValue::Null
        );
    }

    #[test]
    fn caps() {
        let backend = backend_with(&quiet_env(), &[]);
        assert!(backend.has_caps(&[CAP_BANK]));
        assert!(backend.has_caps(&["CapBankWealth"]));
        assert!(!backend.has_caps(&[CAP_MESSAGES]));
        assert_eq!(backend.iter_caps(), vec![CAP_BANK_WEALTH, CAP_BANK]);
    }

    #[test]
    fn fill_with_handler() {
        let backend = backend_with(&quiet_env(), &[]);
        let account = Account {
            id: "1".to_string(),
            a: Field::NotLoaded,
            b: Field::Loaded(5),
        };
        let account = backend.fillobj(account, Some(&["a"])).unwrap();
        assert_eq!(account.a, Field::Loaded(7));
        assert_eq!(account.b, Field::Loaded(5));
    }

    #[test]
    fn fill_unknown_field() {
        let backend = backend_with(&quiet_env(), &[]);
        let err = backend
            .fillobj(Account::default(), Some(&["nonexistent"]))
            .unwrap_err();
        let ModuleError::FieldNotFound { object, field } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(object, "Account()");
        assert_eq!(field, "nonexistent");
    }

    #[test]
    fn fill_without_handler_marks_not_available() {
        let backend = backend_with(&quiet_env(), &[]);
        let transfer = backend.fillobj(Transfer::default(), None).unwrap();
        assert_eq!(transfer.amount, Field::NotAvailable);
    }

    #[test]
    fn fill_leftovers_become_not_available() {
        let backend = backend_with(&quiet_env(), &[]);
        let account = backend.fillobj(Account::default(), None).unwrap();
        assert_eq!(account.a, Field::Loaded(7));
        assert_eq!(account.b, Field::NotAvailable);
    }

    #[test]
    fn fill_complete_object_skips_handler() {
        let backend = backend_with(&quiet_env(), &[]);
        let account = Account {
            id: "1".to_string(),
            a: Field::Loaded(1),
            b: Field::NotAvailable,
        };
        let account = backend.fillobj(account, None).unwrap();
        assert_eq!(account.a, Field::Loaded(1));
    }

    #[test]
    fn type_erased_access() {
        let backend: Box<dyn AnyBackend> = Box::new(backend_with(&quiet_env(), &[]));
        assert_eq!(backend.module_name(), "fakebank");
        assert!(backend.has_caps(&["CapBank"]));
        assert!(backend.downcast_ref::<FakeModule>().is_some());

        let _outer = backend.lock();
        let _inner = backend.lock();
    }
}
