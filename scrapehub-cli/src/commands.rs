//! Subcommand handlers.

use anyhow::{Result, bail};
use serde_json::Value as RawValue;

use scrapehub_app::{AppState, NoopStartupHooks};
use scrapehub_core::types::{BackendInfo, ModuleInfo};
use scrapehub_core::{CoreError, ValuePrompter};
use scrapehub_module::Params;
use scrapehub_module::caps::CAP_NEWS;

use crate::demo::Article;
use crate::terminal::StdTerminal;
use crate::{BackendsCommand, Commands};

/// Parse a `key=value` command line parameter.
pub fn parse_param(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got \"{arg}\""))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in \"{arg}\""));
    }
    Ok((key.to_string(), value.to_string()))
}

fn to_params(pairs: Vec<(String, String)>) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k, RawValue::String(v)))
        .collect()
}

fn filter(list: &[String]) -> Option<&[String]> {
    (!list.is_empty()).then_some(list)
}

pub fn run(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Modules { caps } => {
            let modules = state.module_metadata_service.list_modules(filter(&caps));
            for module in &modules {
                println!("{}", module_line(module));
            }
            Ok(())
        }
        Commands::Module { name } => {
            let module = state.module_metadata_service.get_module(&name)?;
            print!("{}", module_details(&module));
            Ok(())
        }
        Commands::Backends(command) => run_backends(state, command),
        Commands::Load { caps, names } => load(state, &caps, &names),
        Commands::Get { backend, id, fields } => get(state, &backend, id, &fields),
    }
}

fn run_backends(state: &AppState, command: BackendsCommand) -> Result<()> {
    let service = &state.backend_service;
    match command {
        BackendsCommand::List => {
            for backend in service.list_backends()? {
                println!("{}", backend_line(&backend));
            }
        }
        BackendsCommand::Add {
            module,
            name,
            params,
            no_prompt,
        } => {
            let params = to_params(params);
            let name = if no_prompt {
                service.add_backend(&module, name.as_deref(), &params)?
            } else {
                let mut prompter = ValuePrompter::new(StdTerminal::new());
                service.add_backend_interactive(&module, name.as_deref(), &params, &mut prompter)?
            };
            println!("Backend \"{name}\" successfully added.");
        }
        BackendsCommand::Edit {
            name,
            params,
            no_prompt,
        } => {
            let params = to_params(params);
            if no_prompt {
                service.edit_backend(&name, &params)?;
            } else {
                let mut prompter = ValuePrompter::new(StdTerminal::new());
                service.edit_backend_interactive(&name, &params, &mut prompter)?;
            }
            println!("Backend \"{name}\" successfully edited.");
        }
        BackendsCommand::Remove { name } => {
            service.remove_backend(&name)?;
            println!("Backend \"{name}\" removed.");
        }
        BackendsCommand::Check { name } => {
            service.check_backend_config(&name)?;
            println!("Backend \"{name}\" is correctly configured.");
        }
    }
    Ok(())
}

fn load(state: &AppState, caps: &[String], names: &[String]) -> Result<()> {
    let report = if caps.is_empty() && names.is_empty() {
        state.run_startup(&NoopStartupHooks)?
    } else {
        state
            .bootstrap_service
            .load_backends(filter(caps), filter(names), None)?
    };
    state.shutdown();

    for name in &report.loaded {
        println!("{name}: ok");
    }
    for failure in &report.errors {
        println!("{}: {}", failure.name, failure.error);
    }
    if report.error_count() > 0 {
        bail!("{} backend(s) failed to load", report.error_count());
    }
    Ok(())
}

fn get(state: &AppState, name: &str, id: String, fields: &[String]) -> Result<()> {
    let report = state
        .bootstrap_service
        .load_backends(None, Some(&[name.to_string()]), None)?;
    if let Some(failure) = report.errors.first() {
        bail!("Unable to load backend \"{}\": {}", failure.name, failure.error);
    }
    let backend = state.ctx.get_backend(name)?;
    if !backend.has_caps(&[CAP_NEWS]) {
        state.shutdown();
        return Err(CoreError::ValidationError(format!(
            "Backend \"{name}\" does not provide news articles"
        ))
        .into());
    }

    let mut article = Article::new(id);
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    let filled = backend.fill(&mut article, filter_fields(&fields));
    state.shutdown();
    filled?;

    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}

fn filter_fields<'a>(fields: &'a [&'a str]) -> Option<&'a [&'a str]> {
    (!fields.is_empty()).then_some(fields)
}

fn module_line(module: &ModuleInfo) -> String {
    format!(
        "{:<16} {:<6} [{}] {}",
        module.name,
        module.version,
        module.capabilities.join(", "),
        module.description
    )
}

fn module_details(module: &ModuleInfo) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", module.name, module.version);
    if !module.description.is_empty() {
        let _ = writeln!(out, "  {}", module.description);
    }
    if !module.maintainer.is_empty() {
        let _ = writeln!(out, "  Maintainer: {} <{}>", module.maintainer, module.email);
    }
    if !module.license.is_empty() {
        let _ = writeln!(out, "  License: {}", module.license);
    }
    let _ = writeln!(out, "  Capabilities: {}", module.capabilities.join(", "));
    if module.config.is_empty() {
        return out;
    }

    let _ = writeln!(out, "  Configuration:");
    for value in &module.config {
        let mut line = format!("    {}", value.id);
        if let Some(label) = &value.label {
            let _ = write!(line, ": {label}");
        }
        if value.required {
            line.push_str(" (required)");
        }
        if !value.default.is_null() {
            let _ = write!(line, " [{}]", show_raw(&value.default));
        }
        if let Some(choices) = &value.choices {
            let keys: Vec<&str> = choices.iter().map(|(k, _)| k.as_str()).collect();
            let _ = write!(line, " {{{}}}", keys.join("|"));
        }
        let _ = writeln!(out, "{line}");
    }
    out
}

fn backend_line(backend: &BackendInfo) -> String {
    let mut line = format!("{:<16} {}", backend.name, backend.module);
    if !backend.module_available {
        line.push_str(" (module not installed)");
    }
    let params: Vec<String> = backend
        .public_params()
        .map(|(k, v)| format!("{k}={}", show_raw(v)))
        .collect();
    if !params.is_empty() {
        line.push_str("  ");
        line.push_str(&params.join(" "));
    }
    line
}

fn show_raw(v: &RawValue) -> String {
    match v {
        RawValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use scrapehub_module::BackendEntry;

    use super::*;

    #[test]
    fn param_parsing() {
        assert_eq!(
            parse_param("login=bob=1").unwrap(),
            ("login".to_string(), "bob=1".to_string())
        );
        assert_eq!(parse_param(" feed =").unwrap(), ("feed".to_string(), String::new()));
        assert!(parse_param("login").is_err());
        assert!(parse_param("=bob").is_err());
    }

    #[test]
    fn params_are_strings() {
        let params = to_params(vec![("summaries".to_string(), "true".to_string())]);
        assert_eq!(params["summaries"], json!("true"));
    }

    #[test]
    fn backend_line_hides_private_params() {
        let entry = BackendEntry {
            name: "news".to_string(),
            module: "gone".to_string(),
            params: BTreeMap::from([
                ("feed".to_string(), json!("sports")),
                ("_proxy".to_string(), json!("http://p")),
            ]),
        };
        let line = backend_line(&BackendInfo::new(&entry, None, false));
        assert!(line.contains("feed=sports"));
        assert!(line.contains("(module not installed)"));
        assert!(!line.contains("_proxy"));
    }
}
