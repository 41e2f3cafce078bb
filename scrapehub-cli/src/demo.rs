//! Built-in offline news module.
//!
//! Serves generated articles so that backends can be configured, loaded and
//! filled without any network access.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{Value as RawValue, json};

use scrapehub_module::caps::CAP_NEWS;
use scrapehub_module::{
    BackendConfig, Browser, BrowserOptions, Field, FillTable, Logger, Module, ModuleDescriptor,
    ObjectKind, Value, impl_base_object,
};

pub const KIND_ARTICLE: ObjectKind = ObjectKind::new("Article");

/// News article served by [`Demo`].
#[derive(Debug, Default, Serialize)]
pub struct Article {
    pub id: String,
    pub title: Field<String>,
    pub body: Field<String>,
    pub url: Field<String>,
}

impl_base_object!(Article, id: id, kinds: [KIND_ARTICLE], fields: [title, body, url]);

impl Article {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Counts the pages served to one instance across runs.
pub struct DemoBrowser {
    logger: Logger,
    visits: AtomicU64,
}

impl DemoBrowser {
    fn visit(&self) -> u64 {
        let n = self.visits.fetch_add(1, Ordering::SeqCst) + 1;
        self.logger.debug(format_args!("Page visit #{n}"));
        n
    }
}

impl Browser for DemoBrowser {
    fn load_state(&mut self, state: &RawValue) {
        if let Some(visits) = state.get("visits").and_then(RawValue::as_u64) {
            *self.visits.get_mut() = visits;
        }
    }

    fn dump_state(&self) -> Option<RawValue> {
        Some(json!({ "visits": self.visits.load(Ordering::SeqCst) }))
    }
}

pub struct Demo {
    descriptor: ModuleDescriptor,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            descriptor: ModuleDescriptor::new("demo")
                .maintainer("scrapehub", "scrapehub@example.org")
                .version("1.0")
                .description("Offline news feed with generated articles")
                .license("MIT")
                .caps([CAP_NEWS])
                .config(BackendConfig::schema([
                    Value::new("feed")
                        .label("Feed name")
                        .regexp(r"^[a-z][a-z0-9-]*$")
                        .default("headlines"),
                    Value::new("language")
                        .label("Language")
                        .choices([("en", "English"), ("fr", "French")])
                        .default("en"),
                    Value::boolean("summaries")
                        .label("Shorten article bodies")
                        .default(false),
                    Value::new("login").label("Account (optional)").default(""),
                    Value::backend_password("password"),
                ])),
        }
    }
}

impl Module for Demo {
    type Browser = DemoBrowser;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn build_browser(&self, options: BrowserOptions) -> scrapehub_module::Result<Option<DemoBrowser>> {
        Ok(Some(DemoBrowser {
            logger: options.logger,
            visits: AtomicU64::new(0),
        }))
    }

    fn objects(&self) -> FillTable<Self> {
        FillTable::<Self>::new().with(KIND_ARTICLE, |backend, obj, fields| {
            let Some(article) = obj.as_any_mut().downcast_mut::<Article>() else {
                return Ok(());
            };
            let config = backend.config();
            let feed = config["feed"].get_str()?;
            let french = config["language"].get_str()? == "fr";

            if let Some(browser) = backend.browser()? {
                browser.visit();
            }
            for field in fields {
                match field.as_str() {
                    "title" => {
                        article.title = Field::Loaded(if french {
                            format!("{feed} : article n°{}", article.id)
                        } else {
                            format!("{feed}: article #{}", article.id)
                        });
                    }
                    "body" => {
                        let body = generated_body(&article.id, french);
                        article.body = Field::Loaded(if config["summaries"].get_bool()? {
                            body.split('.').next().unwrap_or_default().to_string()
                        } else {
                            body
                        });
                    }
                    // Generated articles have no canonical location.
                    _ => {}
                }
            }
            Ok(())
        })
    }
}

fn generated_body(id: &str, french: bool) -> String {
    if french {
        format!("Contenu de l'article {id}. Il a été généré hors ligne.")
    } else {
        format!("Content of article {id}. It was generated offline.")
    }
}
