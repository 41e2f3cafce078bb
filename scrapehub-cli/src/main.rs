//! scrapehub command line frontend
//!
//! Configures backend instances, loads them and fills objects through the
//! built-in modules. State lives in a work directory:
//!
//! - `backends.json`: configured instances, one object per instance
//! - `storage.json`: per-backend storage (browser state, caches)
//! - `responses/`: dumped responses, with `--save-responses`

mod commands;
mod demo;
mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;

use scrapehub_app::adapters::{JsonBackendsConfig, JsonFileStorage};
use scrapehub_app::{AppState, AppStateBuilder};
use scrapehub_core::Terminal;
use scrapehub_module::{LOGIN_REQUEST, LoggerSettings, Requests, loader};

use crate::terminal::StdTerminal;

const BACKENDS_FILE: &str = "backends.json";
const STORAGE_FILE: &str = "storage.json";
const RESPONSES_DIR: &str = "responses";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Work directory holding the backends and storage files
    #[arg(long, env = "SCRAPEHUB_WORKDIR", global = true)]
    workdir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Dump browser responses under the work directory
    #[arg(long, global = true)]
    save_responses: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available modules
    Modules {
        /// Only modules providing one of these capabilities
        #[arg(long, value_delimiter = ',')]
        caps: Vec<String>,
    },
    /// Show a module and its configuration fields
    Module { name: String },
    /// Manage configured backends
    #[command(subcommand)]
    Backends(BackendsCommand),
    /// Load backends and report failures
    Load {
        /// Only backends whose module provides one of these capabilities
        #[arg(long, value_delimiter = ',')]
        caps: Vec<String>,
        /// Backend names; all when omitted
        names: Vec<String>,
    },
    /// Fetch an article from a news backend
    Get {
        backend: String,
        id: String,
        /// Fields to fill; all missing ones when omitted
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackendsCommand {
    /// List configured backends
    List,
    /// Configure a new backend
    Add {
        module: String,
        /// Instance name; defaults to the first free name after the module
        #[arg(long)]
        name: Option<String>,
        /// Field value, as key=value
        #[arg(short = 'p', long = "param", value_parser = commands::parse_param)]
        params: Vec<(String, String)>,
        /// Do not prompt for fields missing from --param
        #[arg(long)]
        no_prompt: bool,
    },
    /// Change the configuration of a backend
    Edit {
        name: String,
        #[arg(short = 'p', long = "param", value_parser = commands::parse_param)]
        params: Vec<(String, String)>,
        #[arg(long)]
        no_prompt: bool,
    },
    /// Remove a backend
    Remove { name: String },
    /// Validate the stored configuration of a backend
    Check { name: String },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let workdir = resolve_workdir(cli.workdir.clone())?;
    let state = build_state(&workdir, cli.save_responses)?;
    log::debug!("Using work directory {}", workdir.display());

    commands::run(&state, cli.command)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Work directory from the command line, or the user config directory.
fn resolve_workdir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = explicit.unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scrapehub")
    });
    create_private_dir(&dir)
        .with_context(|| format!("Cannot create work directory {}", dir.display()))?;
    Ok(dir)
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

fn build_state(workdir: &Path, save_responses: bool) -> Result<AppState> {
    let backends_config = JsonBackendsConfig::open(workdir.join(BACKENDS_FILE))?;
    let storage = JsonFileStorage::open(workdir.join(STORAGE_FILE))?;

    let requests = Requests::new();
    requests.register(LOGIN_REQUEST, |domain, value| {
        let mut term = StdTerminal::new();
        let label = value.label_text().unwrap_or(value.id());
        term.print(&format!("[{domain}] {label} (hidden input): ")).ok()?;
        term.read_masked().ok().flatten()
    });

    let logger_settings = LoggerSettings {
        responses_dirname: save_responses.then(|| workdir.join(RESPONSES_DIR)),
    };

    let builder = AppStateBuilder::new()
        .backends_config(Arc::new(backends_config))
        .storage(Arc::new(storage))
        .requests(requests)
        .logger_settings(logger_settings)
        .module(loader::<demo::Demo>());

    #[cfg(feature = "keyring")]
    let builder = builder.secret_store(Arc::new(scrapehub_app::adapters::KeyringSecretStore::new()));

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backends_add() {
        let cli = Cli::try_parse_from([
            "scrapehub",
            "backends",
            "add",
            "demo",
            "--name",
            "news",
            "-p",
            "feed=sports",
            "--param",
            "language=fr",
            "--no-prompt",
        ])
        .unwrap();
        let Commands::Backends(BackendsCommand::Add {
            module,
            name,
            params,
            no_prompt,
        }) = cli.command
        else {
            panic!("expected backends add");
        };
        assert_eq!(module, "demo");
        assert_eq!(name.as_deref(), Some("news"));
        assert_eq!(
            params,
            vec![
                ("feed".to_string(), "sports".to_string()),
                ("language".to_string(), "fr".to_string()),
            ]
        );
        assert!(no_prompt);
    }

    #[test]
    fn malformed_param_rejected() {
        let res = Cli::try_parse_from(["scrapehub", "backends", "add", "demo", "-p", "feed"]);
        assert!(res.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["scrapehub", "modules", "--caps", "CapNews,CapBank", "-vv"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Modules { caps } = cli.command else {
            panic!("expected modules");
        };
        assert_eq!(caps, vec!["CapNews", "CapBank"]);
    }

    #[test]
    fn workdir_is_created_private() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = resolve_workdir(Some(tmp.path().join("a/b"))).unwrap();
        assert!(dir.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }
}
