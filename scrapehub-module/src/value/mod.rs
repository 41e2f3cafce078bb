//! Typed, self-describing configuration values.
//!
//! A [`Value`] is declared once in a module schema and copied per backend
//! instance when the configuration is bound. The declaration never fails;
//! validation happens in [`Value::set`] and [`Value::load`].

mod dict;
mod secret;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value as RawValue;

use crate::error::ValueError;
use crate::requests::{LOGIN_REQUEST, Requests};
use crate::utils::log_sanitizer::sanitize_value;

pub use dict::ValuesDict;
pub use secret::{SecretSource, SecretStore, run_secret_command};

/// Date format always accepted by date values, tried last.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const TRUE_TOKENS: [&str; 5] = ["y", "yes", "1", "true", "on"];
const FALSE_TOKENS: [&str; 5] = ["n", "no", "0", "false", "off"];

/// Coercion and validation rules of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text, optionally constrained by a pattern or choices.
    Text,
    /// Non-negative integer.
    Int,
    /// Floating point number.
    Float,
    /// Yes/no flag.
    Bool,
    /// Calendar date, parsed with `formats` then [`DEFAULT_DATE_FORMAT`].
    Date { formats: Vec<String> },
    /// Never persisted, asked on every use.
    Transient,
    /// Secret with deferred resolution, see [`SecretSource`].
    BackendPassword { noprompt: bool },
}

/// Coerced content of a value, as returned by [`Value::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Unset,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format(DEFAULT_DATE_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Binding {
    raw: RawValue,
    domain: Option<String>,
    requests: Option<Requests>,
    resolved: Option<String>,
    stored: bool,
}

/// A named configuration field.
pub struct Value {
    id: String,
    label: Option<String>,
    description: Option<String>,
    default: RawValue,
    regexp: Option<String>,
    /// `regexp` anchored and compiled on first validation.
    pattern: OnceLock<Regex>,
    choices: Option<Vec<(String, String)>>,
    aliases: Option<BTreeMap<String, String>>,
    tiny: Option<bool>,
    masked: bool,
    required: Option<bool>,
    transient: bool,
    kind: ValueKind,
    binding: RwLock<Binding>,
}

impl Value {
    fn with_kind(id: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: None,
            default: RawValue::Null,
            regexp: None,
            pattern: OnceLock::new(),
            choices: None,
            aliases: None,
            tiny: None,
            masked: false,
            required: None,
            transient: false,
            kind,
            binding: RwLock::new(Binding::default()),
        }
    }

    /// Plain text value without default, hence required.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_kind(id, ValueKind::Text)
    }

    pub fn int(id: impl Into<String>) -> Self {
        let mut v = Self::with_kind(id, ValueKind::Int);
        v.regexp = Some(r"^\d+$".to_string());
        v.default = RawValue::from(0);
        v
    }

    pub fn float(id: impl Into<String>) -> Self {
        let mut v = Self::with_kind(id, ValueKind::Float);
        v.regexp = Some(r"^[\d\.]+$".to_string());
        v.default = RawValue::from(0.0);
        v
    }

    pub fn boolean(id: impl Into<String>) -> Self {
        let mut v = Self::with_kind(id, ValueKind::Bool);
        v.choices = Some(vec![
            ("y".to_string(), "True".to_string()),
            ("n".to_string(), "False".to_string()),
        ]);
        v.default = RawValue::Bool(false);
        v
    }

    pub fn date(id: impl Into<String>) -> Self {
        Self::with_kind(
            id,
            ValueKind::Date {
                formats: Vec::new(),
            },
        )
    }

    pub fn transient(id: impl Into<String>) -> Self {
        let mut v = Self::with_kind(id, ValueKind::Transient);
        v.transient = true;
        v.required = Some(false);
        v
    }

    /// Secret value: masked, empty by default, resolved lazily by [`Value::get`].
    pub fn backend_password(id: impl Into<String>) -> Self {
        let mut v = Self::with_kind(id, ValueKind::BackendPassword { noprompt: false });
        v.masked = true;
        v.default = RawValue::String(String::new());
        v
    }

    // ─── Builders ──────────────────────────────────────────

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default(mut self, default: impl Into<RawValue>) -> Self {
        self.default = default.into();
        self
    }

    #[must_use]
    pub fn regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = Some(regexp.into());
        self.pattern = OnceLock::new();
        self
    }

    /// Accepted keys with their display labels, in menu order.
    #[must_use]
    pub fn choices<K, L>(mut self, choices: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        self.choices = Some(
            choices
                .into_iter()
                .map(|(k, l)| (k.into(), l.into()))
                .collect(),
        );
        self
    }

    /// Accepted keys displayed as themselves.
    #[must_use]
    pub fn choice_list<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.choices = Some(
            keys.into_iter()
                .map(|k| {
                    let k = k.into();
                    (k.clone(), k)
                })
                .collect(),
        );
        self
    }

    /// Legacy keys accepted on input and stored as their canonical key.
    #[must_use]
    pub fn aliases<K, C>(mut self, aliases: impl IntoIterator<Item = (K, C)>) -> Self
    where
        K: Into<String>,
        C: Into<String>,
    {
        self.aliases = Some(
            aliases
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn tiny(mut self, tiny: bool) -> Self {
        self.tiny = Some(tiny);
        self
    }

    #[must_use]
    pub fn masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Never ask a password interactively. No effect on other kinds.
    #[must_use]
    pub fn noprompt(mut self, noprompt: bool) -> Self {
        if let ValueKind::BackendPassword { noprompt: n } = &mut self.kind {
            *n = noprompt;
        }
        self
    }

    /// Extra date formats, tried before [`DEFAULT_DATE_FORMAT`]. No effect on
    /// other kinds.
    #[must_use]
    pub fn formats<F: Into<String>>(mut self, formats: impl IntoIterator<Item = F>) -> Self {
        if let ValueKind::Date { formats: f } = &mut self.kind {
            *f = formats.into_iter().map(Into::into).collect();
        }
        self
    }

    // ─── Accessors ─────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Label, falling back to the description.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref().or(self.description.as_deref())
    }

    /// Description, falling back to the label.
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().or(self.label.as_deref())
    }

    pub fn default_value(&self) -> &RawValue {
        &self.default
    }

    pub fn regexp_pattern(&self) -> Option<&str> {
        self.regexp.as_deref()
    }

    pub fn choice_entries(&self) -> Option<&[(String, String)]> {
        self.choices.as_deref()
    }

    pub fn alias_map(&self) -> Option<&BTreeMap<String, String>> {
        self.aliases.as_ref()
    }

    pub fn is_tiny(&self) -> Option<bool> {
        self.tiny
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Explicit requirement, otherwise "has no default".
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.default.is_null())
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_password(&self) -> bool {
        matches!(self.kind, ValueKind::BackendPassword { .. })
    }

    pub fn is_noprompt(&self) -> bool {
        matches!(self.kind, ValueKind::BackendPassword { noprompt: true })
    }

    /// Instance name the value was loaded for, if any.
    pub fn domain(&self) -> Option<String> {
        self.binding.read().domain.clone()
    }

    /// Bound raw content, or the default when nothing was bound.
    pub fn raw(&self) -> RawValue {
        let binding = self.binding.read();
        if binding.raw.is_null() {
            self.default.clone()
        } else {
            binding.raw.clone()
        }
    }

    /// Text of `v` fit for messages: blank when the value is masked.
    pub fn show_value(&self, v: &RawValue) -> String {
        if self.masked {
            String::new()
        } else {
            stringify(v)
        }
    }

    // ─── Validation ────────────────────────────────────────

    /// Check `v` against the declared constraints, without binding it.
    ///
    /// A value equal to the default is always accepted.
    pub fn check_valid(&self, v: &RawValue) -> Result<(), ValueError> {
        if self.is_password() && v.as_str() == Some("") {
            return Ok(());
        }
        if self.is_required() && v.is_null() {
            return Err(ValueError::Required {
                id: self.id.clone(),
            });
        }
        if *v == self.default {
            return Ok(());
        }

        let mut check_choices = true;
        match &self.kind {
            ValueKind::Bool => {
                return if parse_bool(v).is_some() {
                    Ok(())
                } else {
                    Err(ValueError::NotBoolean {
                        id: self.id.clone(),
                        value: self.show_value(v),
                    })
                };
            }
            ValueKind::Int if !v.is_null() && parse_int(v).is_none() => {
                return Err(ValueError::NotInteger {
                    id: self.id.clone(),
                    value: self.show_value(v),
                });
            }
            ValueKind::Float if parse_float(v).is_none() => {
                return Err(ValueError::NotFloat {
                    id: self.id.clone(),
                    value: self.show_value(v),
                });
            }
            ValueKind::Date { formats } => {
                check_choices = false;
                if !v.is_null() && parse_date(v, formats).is_none() {
                    return Err(ValueError::InvalidDate {
                        id: self.id.clone(),
                        value: self.show_value(v),
                        formats: date_formats(formats),
                    });
                }
            }
            _ => {}
        }

        let text = stringify(v);

        if v.as_str() == Some("")
            && self.default.as_str() != Some("")
            && !self.has_choice("")
        {
            return Err(ValueError::Empty {
                id: self.id.clone(),
            });
        }

        if let Some(pattern) = &self.regexp {
            let re = self.compiled_regexp(pattern)?;
            if !re.is_match(&text) {
                return Err(ValueError::PatternMismatch {
                    id: self.id.clone(),
                    value: self.show_value(v),
                    regexp: pattern.clone(),
                });
            }
        }

        if check_choices && let Some(choices) = &self.choices {
            let aliased = self
                .aliases
                .as_ref()
                .is_some_and(|a| a.contains_key(&text));
            if !self.has_choice(&text) && !aliased {
                return Err(ValueError::NotInChoices {
                    id: self.id.clone(),
                    value: self.show_value(v),
                    choices: choices.iter().map(|(k, _)| k.clone()).collect(),
                });
            }
        }

        Ok(())
    }

    fn compiled_regexp(&self, pattern: &str) -> Result<&Regex, ValueError> {
        if let Some(re) = self.pattern.get() {
            return Ok(re);
        }
        let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ValueError::InvalidPattern {
            id: self.id.clone(),
            regexp: pattern.to_string(),
            detail: e.to_string(),
        })?;
        Ok(self.pattern.get_or_init(|| re))
    }

    fn has_choice(&self, key: &str) -> bool {
        self.choices
            .as_ref()
            .is_some_and(|c| c.iter().any(|(k, _)| k == key))
    }

    /// Validate and bind `v`, canonicalizing aliased keys.
    pub fn set(&mut self, v: impl Into<RawValue>) -> Result<(), ValueError> {
        let v = canonicalize(v.into());
        self.check_valid(&v)?;

        if self.is_password() && v.is_null() {
            return Ok(());
        }

        let v = match &self.aliases {
            Some(aliases) if !v.is_null() => aliases
                .get(&stringify(&v))
                .map_or(v, |canonical| RawValue::String(canonical.clone())),
            _ => v,
        };

        let binding = self.binding.get_mut();
        binding.raw = v;
        binding.resolved = None;
        binding.stored = true;
        Ok(())
    }

    /// Bind `v` for the backend instance `domain`.
    ///
    /// Passwords additionally remember the instance and the request handle
    /// so that [`Value::get`] can ask for the secret later.
    pub fn load(
        &mut self,
        domain: &str,
        v: impl Into<RawValue>,
        requests: &Requests,
    ) -> Result<(), ValueError> {
        let v = v.into();
        let is_null = v.is_null();
        self.set(v)?;
        if self.is_password() && !is_null {
            let binding = self.binding.get_mut();
            binding.domain = Some(domain.to_string());
            binding.requests = Some(requests.clone());
        }
        Ok(())
    }

    // ─── Retrieval ─────────────────────────────────────────

    /// Coerced content.
    ///
    /// For passwords this resolves the secret: literal, shell command output,
    /// secret store entry or operator prompt, in that order of applicability.
    pub fn get(&self) -> Result<Setting, ValueError> {
        let raw = self.raw();
        match &self.kind {
            ValueKind::Text | ValueKind::Transient => Ok(match raw {
                RawValue::Null => Setting::Unset,
                RawValue::Bool(b) => Setting::Bool(b),
                RawValue::Number(n) => n
                    .as_i64()
                    .map_or_else(|| Setting::Float(n.as_f64().unwrap_or_default()), Setting::Int),
                other => Setting::Text(stringify(&other)),
            }),
            ValueKind::Int => {
                if raw.is_null() {
                    return Ok(Setting::Unset);
                }
                parse_int(&raw).map(Setting::Int).ok_or_else(|| ValueError::NotInteger {
                    id: self.id.clone(),
                    value: self.show_value(&raw),
                })
            }
            ValueKind::Float => {
                if raw.is_null() {
                    return Ok(Setting::Unset);
                }
                parse_float(&raw).map(Setting::Float).ok_or_else(|| ValueError::NotFloat {
                    id: self.id.clone(),
                    value: self.show_value(&raw),
                })
            }
            ValueKind::Bool => Ok(Setting::Bool(match &raw {
                RawValue::Bool(b) => *b,
                other => TRUE_TOKENS.contains(&stringify(other).to_lowercase().as_str()),
            })),
            ValueKind::Date { formats } => {
                if raw.is_null() {
                    return Ok(Setting::Unset);
                }
                parse_date(&raw, formats).map(Setting::Date).ok_or_else(|| {
                    ValueError::InvalidDate {
                        id: self.id.clone(),
                        value: self.show_value(&raw),
                        formats: date_formats(formats),
                    }
                })
            }
            ValueKind::BackendPassword { noprompt } => {
                self.resolve_secret(&raw, *noprompt).map(Setting::Text)
            }
        }
    }

    fn resolve_secret(&self, raw: &RawValue, noprompt: bool) -> Result<String, ValueError> {
        let (domain, requests) = {
            let binding = self.binding.read();
            if let Some(resolved) = &binding.resolved {
                return Ok(resolved.clone());
            }
            (binding.domain.clone(), binding.requests.clone())
        };

        let text = stringify(raw);
        let secret = match SecretSource::parse(&text) {
            SecretSource::Literal(s) => return Ok(s),
            SecretSource::ShellCommand(cmd) => {
                let secret = run_secret_command(&cmd).map_err(|detail| {
                    ValueError::SecretCommand {
                        id: self.id.clone(),
                        detail,
                    }
                })?;
                self.binding.write().resolved = Some(secret.clone());
                return Ok(secret);
            }
            SecretSource::PromptOnDemand => {
                let (Some(domain), Some(requests)) = (domain, requests) else {
                    return Ok(String::new());
                };
                let from_store = requests.stored_secret(&domain, &self.id);
                match from_store {
                    Some(s) => Some(s),
                    None if !noprompt => requests.request(LOGIN_REQUEST, &domain, self),
                    None => None,
                }
            }
        };

        let Some(secret) = secret else {
            return Ok(String::new());
        };
        let mut binding = self.binding.write();
        binding.resolved = Some(secret.clone());
        binding.stored = false;
        Ok(secret)
    }

    pub fn get_str(&self) -> Result<String, ValueError> {
        self.get().map(|s| s.to_string())
    }

    pub fn get_bool(&self) -> Result<bool, ValueError> {
        match self.get()? {
            Setting::Bool(b) => Ok(b),
            other => {
                let raw = RawValue::String(other.to_string());
                parse_bool(&raw).ok_or_else(|| ValueError::NotBoolean {
                    id: self.id.clone(),
                    value: self.show_value(&raw),
                })
            }
        }
    }

    pub fn get_int(&self) -> Result<i64, ValueError> {
        match self.get()? {
            Setting::Int(i) => Ok(i),
            other => {
                let raw = RawValue::String(other.to_string());
                parse_int(&raw).ok_or_else(|| ValueError::NotInteger {
                    id: self.id.clone(),
                    value: self.show_value(&raw),
                })
            }
        }
    }

    pub fn get_float(&self) -> Result<f64, ValueError> {
        match self.get()? {
            Setting::Float(x) => Ok(x),
            #[allow(clippy::cast_precision_loss)]
            Setting::Int(i) => Ok(i as f64),
            other => {
                let raw = RawValue::String(other.to_string());
                parse_float(&raw).ok_or_else(|| ValueError::NotFloat {
                    id: self.id.clone(),
                    value: self.show_value(&raw),
                })
            }
        }
    }

    pub fn get_date(&self) -> Result<Option<NaiveDate>, ValueError> {
        let formats = match &self.kind {
            ValueKind::Date { formats } => formats.clone(),
            _ => Vec::new(),
        };
        match self.get()? {
            Setting::Date(d) => Ok(Some(d)),
            Setting::Unset => Ok(None),
            other => {
                let raw = RawValue::String(other.to_string());
                parse_date(&raw, &formats)
                    .map(Some)
                    .ok_or_else(|| ValueError::InvalidDate {
                        id: self.id.clone(),
                        value: self.show_value(&raw),
                        formats: date_formats(&formats),
                    })
            }
        }
    }

    /// Persistable form of the bound content.
    pub fn dump(&self) -> RawValue {
        match &self.kind {
            ValueKind::Transient => RawValue::String(String::new()),
            ValueKind::BackendPassword { .. } => {
                let binding = self.binding.read();
                if binding.stored && binding.raw.is_string() {
                    binding.raw.clone()
                } else {
                    RawValue::String(String::new())
                }
            }
            _ => self.raw(),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            default: self.default.clone(),
            regexp: self.regexp.clone(),
            pattern: self.pattern.clone(),
            choices: self.choices.clone(),
            aliases: self.aliases.clone(),
            tiny: self.tiny,
            masked: self.masked,
            required: self.required,
            transient: self.transient,
            kind: self.kind.clone(),
            binding: RwLock::new(self.binding.read().clone()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("required", &self.is_required())
            .field("value", &sanitize_value(&self.raw(), self.masked))
            .finish_non_exhaustive()
    }
}

// ─── Coercion helpers ──────────────────────────────────────

fn stringify(v: &RawValue) -> String {
    match v {
        RawValue::Null => String::new(),
        RawValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn canonicalize(v: RawValue) -> RawValue {
    match v {
        RawValue::String(s) => RawValue::String(s.trim_matches(['\r', '\n']).to_string()),
        other => other,
    }
}

fn parse_bool(v: &RawValue) -> Option<bool> {
    if let RawValue::Bool(b) = v {
        return Some(*b);
    }
    let token = stringify(v).to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn parse_int(v: &RawValue) -> Option<i64> {
    match v {
        RawValue::Number(n) => n.as_i64(),
        other => stringify(other).trim().parse().ok(),
    }
}

fn parse_float(v: &RawValue) -> Option<f64> {
    match v {
        RawValue::Number(n) => n.as_f64(),
        other => stringify(other).trim().parse().ok(),
    }
}

fn date_formats(formats: &[String]) -> Vec<String> {
    formats
        .iter()
        .cloned()
        .chain(std::iter::once(DEFAULT_DATE_FORMAT.to_string()))
        .collect()
}

fn parse_date(v: &RawValue, formats: &[String]) -> Option<NaiveDate> {
    let text = stringify(v);
    date_formats(formats)
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
}
