//! Console prompting of configuration values.

use std::collections::BTreeMap;
use std::io;

use serde_json::Value as RawValue;

use scrapehub_module::log_sanitizer::MASK;
use scrapehub_module::{BackendConfig, SecretSource, Value, ValueKind, run_secret_command};

use crate::error::{CoreError, CoreResult};

/// Line-oriented console used by [`ValuePrompter`].
pub trait Terminal {
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Next input line, `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Like [`read_line`](Self::read_line) without echoing the typed text.
    fn read_masked(&mut self) -> io::Result<Option<String>>;

    /// Dry run of a password command before it is saved.
    fn run_command_check(&mut self, command: &str) -> Result<(), String> {
        run_secret_command(command).map(|_| ())
    }
}

/// Asks the operator for configuration values until they validate.
pub struct ValuePrompter<T: Terminal> {
    term: T,
}

impl<T: Terminal> ValuePrompter<T> {
    pub fn new(term: T) -> Self {
        Self { term }
    }

    pub fn terminal(&self) -> &T {
        &self.term
    }

    pub fn into_inner(self) -> T {
        self.term
    }

    /// Prompt every field of `config` except transient ones and `skip`.
    pub fn prompt_config(&mut self, config: &mut BackendConfig, skip: &[String]) -> CoreResult<()> {
        for value in config.values_mut().iter_mut() {
            if value.is_transient() || skip.iter().any(|s| s == value.id()) {
                continue;
            }
            self.prompt_value(value)?;
        }
        Ok(())
    }

    /// Prompt one value; its current setting is the default answer.
    pub fn prompt_value(&mut self, value: &mut Value) -> CoreResult<()> {
        if value.is_password() {
            self.prompt_password(value)
        } else {
            self.ask(value)
        }
    }

    fn ask(&mut self, value: &mut Value) -> CoreResult<()> {
        let current = value.raw();
        let is_bool = matches!(value.kind(), ValueKind::Bool);
        let mut question = question_text(value);
        let mut aliases = BTreeMap::new();
        let mut tiny = false;

        if is_bool {
            let yes = value.get_bool().unwrap_or(false);
            question.push_str(if yes { " (Y/n)" } else { " (y/N)" });
        } else if let Some(choices) = value.choice_entries() {
            tiny = value.is_tiny().unwrap_or_else(|| {
                choices
                    .iter()
                    .all(|(key, _)| key.len() <= 5 && !key.contains(' '))
            });
            if tiny {
                let keys: Vec<String> = choices
                    .iter()
                    .map(|(key, _)| {
                        if current.as_str() == Some(key.as_str()) {
                            key.to_uppercase()
                        } else {
                            key.clone()
                        }
                    })
                    .collect();
                question.push_str(&format!(" ({})", keys.join("/")));
                for (key, _) in choices {
                    let upper = key.to_uppercase();
                    if upper != *key {
                        aliases.insert(upper, key.clone());
                    }
                }
            } else {
                for (n, (key, label)) in choices.iter().enumerate() {
                    self.term.print(&format!("     {:2}) {label}\n", n + 1))?;
                    aliases.insert((n + 1).to_string(), key.clone());
                }
                question.push_str(" (choose in list)");
            }
        }

        let masked = value.is_masked();
        if masked {
            question.push_str(" (hidden input)");
        }
        let has_current = !current.is_null() && current.as_str() != Some("");
        if !is_bool && !tiny && has_current {
            let shown = if masked { MASK.to_string() } else { display_raw(&current) };
            question.push_str(&format!(" [{shown}]"));
        }
        question.push_str(": ");

        loop {
            self.term.print(&question)?;
            let line = if masked {
                self.term.read_masked()?
            } else {
                self.term.read_line()?
            };
            let Some(line) = line else {
                return Err(end_of_input());
            };
            let line = line.trim_end_matches(['\r', '\n']);

            let input = if line.is_empty() {
                current.clone()
            } else if let Some(key) = aliases.get(line) {
                RawValue::String(key.clone())
            } else {
                RawValue::String(line.to_string())
            };

            match value.set(input) {
                Ok(()) => return Ok(()),
                Err(e) => self.term.print(&format!("Error: {e}\n"))?,
            }
        }
    }

    fn prompt_password(&mut self, value: &mut Value) -> CoreResult<()> {
        let noprompt = value.is_noprompt();
        let current = value.raw();
        let current = current.as_str().unwrap_or_default();

        let mut choices = vec![("c", "Run an external tool during backend load")];
        if !noprompt {
            choices.push(("p", "Prompt value when needed (do not store it)"));
        }
        choices.push(("s", "Store value in config"));
        let default = if SecretSource::is_command(current) {
            "c"
        } else if current.is_empty() && !noprompt {
            "p"
        } else {
            "s"
        };

        self.term.print(&format!("{}\n", question_text(value)))?;
        let mut how = Value::new("storage")
            .label("*** How do you want to store it?")
            .choices(choices)
            .default(default)
            .tiny(true);
        self.ask(&mut how)?;

        match how.get_str()?.as_str() {
            "p" => Ok(value.set("")?),
            "c" => self.ask_command(value),
            _ => self.ask(value),
        }
    }

    fn ask_command(&mut self, value: &mut Value) -> CoreResult<()> {
        self.term.print(
            "Enter the shell command that will print the password on its standard output.\n",
        )?;
        loop {
            self.term.print("Command: ")?;
            let Some(line) = self.term.read_line()? else {
                return Err(end_of_input());
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let directive = if SecretSource::is_command(line) {
                line.to_string()
            } else {
                format!("`{line}`")
            };
            match self.term.run_command_check(&directive[1..directive.len() - 1]) {
                Ok(()) => return Ok(value.set(directive)?),
                Err(e) => self.term.print(&format!("Error: {e}\n"))?,
            }
        }
    }
}

/// Label of a value, its description in parentheses, falling back to the id.
fn question_text(value: &Value) -> String {
    match (value.label_text(), value.description_text()) {
        (Some(label), Some(desc)) if label != desc => format!("{label} ({desc})"),
        (Some(text), _) | (None, Some(text)) => text.to_string(),
        (None, None) => value.id().to_string(),
    }
}

fn display_raw(v: &RawValue) -> String {
    match v {
        RawValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn end_of_input() -> CoreError {
    CoreError::Io("unexpected end of input".to_string())
}
