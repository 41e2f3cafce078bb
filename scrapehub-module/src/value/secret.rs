//! Secret sources for password values.
//!
//! A password value is configured either with the secret itself, with a shell
//! command printing it (written `` `command` `` in the configuration), or left
//! empty to be asked when first needed.

use std::process::Command;

use crate::error::StoreError;

/// Where the secret of a password value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// The secret is stored in the configuration.
    Literal(String),
    /// The secret is printed on stdout by this shell command.
    ShellCommand(String),
    /// The secret is asked to the operator when first needed.
    PromptOnDemand,
}

impl SecretSource {
    /// Parse the configuration text of a password value.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            Self::PromptOnDemand
        } else if Self::is_command(raw) {
            Self::ShellCommand(raw[1..raw.len() - 1].to_string())
        } else {
            Self::Literal(raw.to_string())
        }
    }

    /// Whether the configuration text is a `` `command` `` directive.
    pub fn is_command(raw: &str) -> bool {
        raw.len() >= 2 && raw.starts_with('`') && raw.ends_with('`')
    }

    /// Configuration text persisted for this source.
    pub fn directive(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::ShellCommand(cmd) => format!("`{cmd}`"),
            Self::PromptOnDemand => String::new(),
        }
    }
}

/// Run a secret command through the shell and return its output, trailing
/// newlines removed.
///
/// The error message only carries the exit status or spawn failure; the
/// command output is never included.
pub fn run_secret_command(command: &str) -> Result<String, String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(format!("command exited with {}", output.status));
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| e.to_string())?;
    Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
}

/// Persistent secret storage consulted before prompting the operator.
///
/// Secrets are addressed by the backend instance name (`domain`) and the
/// value identifier.
pub trait SecretStore: Send + Sync {
    /// Look a secret up, `None` when absent or unreadable.
    fn get_secret(&self, domain: &str, key: &str) -> Option<String>;

    /// Store a secret.
    fn set_secret(&self, domain: &str, key: &str, secret: &str) -> Result<(), StoreError>;

    /// Remove a secret; absent secrets are not an error.
    fn delete_secret(&self, domain: &str, key: &str) -> Result<(), StoreError>;
}
