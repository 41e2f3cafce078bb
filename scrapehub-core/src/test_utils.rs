//! Test helper module
//!
//! Small modules, a scripted terminal and a ready-made service context.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use serde_json::{Value as RawValue, json};

use scrapehub_module::caps::{CAP_BANK, CAP_NEWS};
use scrapehub_module::{
    BackendConfig, BackendsConfig, Context, InMemoryBackendsConfig, Module, ModuleDescriptor,
    ModuleLoader, NoBrowser, Params, Value, loader,
};

use crate::services::{ServiceContext, Terminal};
use crate::traits::{InMemoryBackendRegistry, InMemoryModuleRegistry};

// ===== Modules =====

pub struct TestBank {
    descriptor: ModuleDescriptor,
}

impl Default for TestBank {
    fn default() -> Self {
        Self {
            descriptor: ModuleDescriptor::new("testbank")
                .version("1.0")
                .description("Test bank")
                .caps([CAP_BANK])
                .config(BackendConfig::schema([
                    Value::new("login").label("Identifier").required(true),
                    Value::new("website")
                        .label("Website")
                        .choices([("par", "Particuliers"), ("pro", "Professionnels")])
                        .default("par")
                        .tiny(false),
                    Value::backend_password("password"),
                ])),
        }
    }
}

impl Module for TestBank {
    type Browser = NoBrowser;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

pub struct TestNews {
    descriptor: ModuleDescriptor,
}

impl Default for TestNews {
    fn default() -> Self {
        Self {
            descriptor: ModuleDescriptor::new("testnews")
                .version("1.0")
                .caps([CAP_NEWS])
                .config(BackendConfig::schema([
                    Value::new("url").default("https://example.org/rss")
                ])),
        }
    }
}

impl Module for TestNews {
    type Browser = NoBrowser;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

pub struct TestPlain {
    descriptor: ModuleDescriptor,
}

impl Default for TestPlain {
    fn default() -> Self {
        Self {
            descriptor: ModuleDescriptor::new("testplain"),
        }
    }
}

impl Module for TestPlain {
    type Browser = NoBrowser;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

pub fn bank_loader() -> Arc<dyn ModuleLoader> {
    loader::<TestBank>()
}

pub fn news_loader() -> Arc<dyn ModuleLoader> {
    loader::<TestNews>()
}

pub fn params(pairs: &[(&str, RawValue)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn bank_params() -> Params {
    params(&[("login", json!("bob"))])
}

pub fn module_context() -> Context {
    Context::new().with_env(|_| None)
}

/// Service context over in-memory collaborators, with the test modules
/// registered.
pub fn create_test_context() -> (Arc<ServiceContext>, Arc<InMemoryBackendsConfig>) {
    let store = Arc::new(InMemoryBackendsConfig::new());
    let modules =
        InMemoryModuleRegistry::with_loaders([bank_loader(), news_loader(), loader::<TestPlain>()]);
    let ctx = ServiceContext::new(
        Arc::new(modules),
        Arc::new(InMemoryBackendRegistry::new()),
        module_context().with_backends_config(Arc::clone(&store) as Arc<dyn BackendsConfig>),
        None,
    );
    (Arc::new(ctx), store)
}

// ===== ScriptedTerminal =====

/// Terminal replaying canned input lines and recording what is printed.
pub struct ScriptedTerminal {
    input: VecDeque<String>,
    output: String,
    masked_reads: usize,
    commands: Vec<String>,
    failing_command: Option<String>,
}

impl ScriptedTerminal {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(|l| (*l).to_string()).collect(),
            output: String::new(),
            masked_reads: 0,
            commands: Vec::new(),
            failing_command: None,
        }
    }

    /// Make the dry run of `command` fail.
    pub fn failing_command(mut self, command: &str) -> Self {
        self.failing_command = Some(command.to_string());
        self
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn masked_reads(&self) -> usize {
        self.masked_reads
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl Terminal for ScriptedTerminal {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn read_masked(&mut self) -> io::Result<Option<String>> {
        self.masked_reads += 1;
        Ok(self.input.pop_front())
    }

    fn run_command_check(&mut self, command: &str) -> Result<(), String> {
        self.commands.push(command.to_string());
        if self.failing_command.as_deref() == Some(command) {
            Err("command exited with exit status: 1".to_string())
        } else {
            Ok(())
        }
    }
}
