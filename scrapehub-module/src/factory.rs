//! Type-erased module loaders.

use std::sync::Arc;

use crate::config::Params;
use crate::context::Context;
use crate::error::Result;
use crate::logger::Logger;
use crate::module::{AnyBackend, Backend, Module, ModuleDescriptor};
use crate::storage::Storage;

/// Creates backends of one module without knowing its type.
pub trait ModuleLoader: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Build a configured instance of the module.
    fn create_instance(
        &self,
        ctx: &Context,
        name: &str,
        params: &Params,
        storage: Option<Arc<dyn Storage>>,
        parent_logger: Option<&Logger>,
        nofail: bool,
    ) -> Result<Box<dyn AnyBackend>>;
}

type Make<M> = Box<dyn Fn() -> M + Send + Sync>;

struct TypedLoader<M: Module> {
    descriptor: ModuleDescriptor,
    make: Make<M>,
}

impl<M: Module> ModuleLoader for TypedLoader<M> {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn create_instance(
        &self,
        ctx: &Context,
        name: &str,
        params: &Params,
        storage: Option<Arc<dyn Storage>>,
        parent_logger: Option<&Logger>,
        nofail: bool,
    ) -> Result<Box<dyn AnyBackend>> {
        let backend = Backend::new((self.make)(), ctx, name, params, storage, parent_logger, nofail)?;
        Ok(Box::new(backend))
    }
}

/// Loader of a module constructed with `Default`.
pub fn loader<M: Module + Default>() -> Arc<dyn ModuleLoader> {
    loader_with(M::default)
}

/// Loader of a module constructed by `make`.
pub fn loader_with<M, F>(make: F) -> Arc<dyn ModuleLoader>
where
    M: Module,
    F: Fn() -> M + Send + Sync + 'static,
{
    let descriptor = make().descriptor().clone();
    Arc::new(TypedLoader {
        descriptor,
        make: Box::new(make),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::browser::NoBrowser;
    use crate::caps::CAP_NEWS;
    use crate::config::BackendConfig;
    use crate::value::Value;

    struct Feeds {
        descriptor: ModuleDescriptor,
    }

    impl Default for Feeds {
        fn default() -> Self {
            Self {
                descriptor: ModuleDescriptor::new("feeds")
                    .caps([CAP_NEWS])
                    .config(BackendConfig::schema([Value::new("url")])),
            }
        }
    }

    impl Module for Feeds {
        type Browser = NoBrowser;

        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }
    }

    #[test]
    fn create_instance() {
        let loader = loader::<Feeds>();
        assert_eq!(loader.descriptor().name, "feeds");

        let params: Params = [("url".to_string(), json!("https://example.org/rss"))]
            .into_iter()
            .collect();
        let backend = loader
            .create_instance(&Context::new(), "news", &params, None, None, false)
            .unwrap();
        assert_eq!(backend.name(), "news");
        assert_eq!(backend.module_name(), "feeds");
        assert!(backend.has_caps(&[CAP_NEWS]));
    }

    #[test]
    fn create_instance_reports_config_errors() {
        let loader = loader::<Feeds>();
        let res = loader.create_instance(&Context::new(), "news", &Params::new(), None, None, false);
        assert!(res.is_err());
    }
}
