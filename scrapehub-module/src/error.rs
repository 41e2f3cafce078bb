use serde::Serialize;
use thiserror::Error;

/// Validation failure of a single configuration value.
///
/// Messages never contain the content of a masked value: callers build them
/// from [`Value::show_value`](crate::Value::show_value), which renders masked
/// input as an empty string.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code")]
pub enum ValueError {
    /// The value is required and no binding was supplied.
    #[error("Value is required and thus must be set")]
    Required {
        /// Value identifier.
        id: String,
    },

    /// An empty string was supplied where the value cannot be empty.
    #[error("Value can't be empty")]
    Empty {
        /// Value identifier.
        id: String,
    },

    /// The stringified value does not fully match the declared pattern.
    #[error("Value \"{value}\" does not match regexp \"{regexp}\"")]
    PatternMismatch {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
        /// Declared pattern.
        regexp: String,
    },

    /// The declared pattern itself does not compile.
    #[error("Invalid regexp \"{regexp}\": {detail}")]
    InvalidPattern {
        /// Value identifier.
        id: String,
        /// Declared pattern.
        regexp: String,
        /// Compiler message.
        detail: String,
    },

    /// The value is neither a declared choice nor an alias.
    #[error("Value \"{value}\" is not in list: {}", .choices.join(", "))]
    NotInChoices {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
        /// Accepted choice keys, in declaration order.
        choices: Vec<String>,
    },

    /// The value is not an integer.
    #[error("Value \"{value}\" is not an integer value")]
    NotInteger {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
    },

    /// The value is not a float.
    #[error("Value \"{value}\" is not a float value")]
    NotFloat {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
    },

    /// The value is not a recognised boolean token.
    #[error("Value \"{value}\" is not a boolean (y/n)")]
    NotBoolean {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
    },

    /// The value does not parse with any accepted date format.
    #[error("Value \"{value}\" does not match format in {}", .formats.join(", "))]
    InvalidDate {
        /// Value identifier.
        id: String,
        /// Displayable value (blank when masked).
        value: String,
        /// Formats that were tried.
        formats: Vec<String>,
    },

    /// The shell command configured as a secret source failed.
    #[error("Command for \"{id}\" failed: {detail}")]
    SecretCommand {
        /// Value identifier.
        id: String,
        /// Failure details (never the command output).
        detail: String,
    },
}

impl ValueError {
    /// Identifier of the value that failed validation.
    pub fn id(&self) -> &str {
        match self {
            Self::Required { id }
            | Self::Empty { id }
            | Self::PatternMismatch { id, .. }
            | Self::InvalidPattern { id, .. }
            | Self::NotInChoices { id, .. }
            | Self::NotInteger { id, .. }
            | Self::NotFloat { id, .. }
            | Self::NotBoolean { id, .. }
            | Self::InvalidDate { id, .. }
            | Self::SecretCommand { id, .. } => id,
        }
    }
}

/// Why binding a configuration field failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "error")]
pub enum ConfigErrorKind {
    /// A required field has no value and no default.
    Missing,
    /// The supplied value was rejected.
    Invalid(ValueError),
}

/// A backend instance could not be configured.
///
/// Always carries the instance name, the offending field and its description,
/// so the calling application can report it or re-prompt the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigError {
    /// Backend instance name.
    pub instance: String,
    /// Offending field identifier.
    pub field: String,
    /// Human description of the field.
    pub description: Option<String>,
    /// Failure kind.
    pub kind: ConfigErrorKind,
}

impl ConfigError {
    pub fn missing(
        instance: impl Into<String>,
        field: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            field: field.into(),
            description,
            kind: ConfigErrorKind::Missing,
        }
    }

    pub fn invalid(
        instance: impl Into<String>,
        field: impl Into<String>,
        description: Option<String>,
        error: ValueError,
    ) -> Self {
        Self {
            instance: instance.into(),
            field: field.into(),
            description,
            kind: ConfigErrorKind::Invalid(error),
        }
    }

    /// Fields the operator has to fix.
    pub fn bad_fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ConfigErrorKind::Missing => write!(
                f,
                "Backend({}): Configuration error: Missing parameter \"{}\" ({})",
                self.instance,
                self.field,
                self.description.as_deref().unwrap_or_default()
            ),
            ConfigErrorKind::Invalid(e) => write!(
                f,
                "Backend({}): Configuration error for field \"{}\": {e}",
                self.instance, self.field
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of a storage or backends-config collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {detail}")]
    Io { path: String, detail: String },

    /// The backing data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing file is readable by other users.
    #[error("Permissions of {path} are too open ({mode:o}), expected 600")]
    WrongPermissions { path: String, mode: u32 },

    /// An instance with this name is already configured.
    #[error("Backend \"{0}\" already exists")]
    BackendAlreadyExists(String),

    /// The instance name is empty or otherwise unusable.
    #[error("Invalid backend name \"{0}\"")]
    InvalidName(String),

    /// No instance with this name is configured.
    #[error("Backend \"{0}\" not found")]
    BackendNotFound(String),

    /// No collaborator is attached to the application context.
    #[error("No {0} is attached")]
    NotAttached(String),
}

/// Umbrella error of the module framework.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ModuleError {
    /// Backend configuration failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A single value failed validation or resolution.
    #[error("{0}")]
    Value(#[from] ValueError),

    /// A fill request named a field the object does not declare.
    #[error("{object} does not have field \"{field}\"")]
    FieldNotFound { object: String, field: String },

    /// The browser could not be built.
    #[error("[{backend}] Unable to create browser: {detail}")]
    Browser { backend: String, detail: String },

    /// A fill handler failed.
    #[error("[{backend}] Unable to fill object: {detail}")]
    Fill { backend: String, detail: String },

    /// The configuration is a schema, not bound to an instance.
    #[error("Configuration is not bound to a backend instance")]
    NotBound,

    /// The backend was deinitialized and cannot be used anymore.
    #[error("Backend \"{0}\" is deinitialized")]
    Deinitialized(String),

    /// Storage or backends-config failure.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ModuleError {
    /// Whether the error stems from user input or configuration rather than a
    /// malfunction; used to choose between `warn` and `error` log levels.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Config(_) | Self::Value(_) => true,
            Self::Store(e) => matches!(
                e,
                StoreError::BackendAlreadyExists(_) | StoreError::BackendNotFound(_)
            ),
            _ => false,
        }
    }
}

/// Convenience type alias for `Result<T, ModuleError>`.
pub type Result<T> = std::result::Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_parameter() {
        let e = ConfigError::missing("bank", "login", Some("Identifier".to_string()));
        assert_eq!(
            e.to_string(),
            "Backend(bank): Configuration error: Missing parameter \"login\" (Identifier)"
        );
        assert_eq!(e.bad_fields(), vec!["login"]);
    }

    #[test]
    fn display_invalid_field() {
        let e = ConfigError::invalid(
            "bank",
            "website",
            None,
            ValueError::NotInChoices {
                id: "website".to_string(),
                value: "foo".to_string(),
                choices: vec!["par".to_string(), "pro".to_string()],
            },
        );
        assert_eq!(
            e.to_string(),
            "Backend(bank): Configuration error for field \"website\": Value \"foo\" is not in list: par, pro"
        );
    }

    #[test]
    fn value_error_id() {
        let e = ValueError::Empty {
            id: "password".to_string(),
        };
        assert_eq!(e.id(), "password");
    }

    #[test]
    fn expected_errors() {
        let config = ModuleError::Config(ConfigError::missing("a", "b", None));
        assert!(config.is_expected());

        let exists = ModuleError::Store(StoreError::BackendAlreadyExists("a".to_string()));
        assert!(exists.is_expected());

        let io = ModuleError::Store(StoreError::Io {
            path: "/tmp/x".to_string(),
            detail: "denied".to_string(),
        });
        assert!(!io.is_expected());
    }

    #[test]
    fn serialize_config_error() {
        let e = ModuleError::Config(ConfigError::missing("a", "login", None));
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"Config\""));
        assert!(json.contains("\"field\":\"login\""));
    }
}
