//! Serializable views returned by the services.

use serde::Serialize;
use serde_json::Value as RawValue;

use scrapehub_module::log_sanitizer::MASK;
use scrapehub_module::{BackendEntry, ModuleDescriptor, Params, Value, is_private_param};

/// Metadata of a registered module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub maintainer: String,
    pub email: String,
    pub version: String,
    pub description: String,
    pub license: String,
    /// Declared capabilities and their ancestors.
    pub capabilities: Vec<String>,
    /// Configuration schema, in declaration order.
    pub config: Vec<ValueInfo>,
}

impl From<&ModuleDescriptor> for ModuleInfo {
    fn from(d: &ModuleDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            maintainer: d.maintainer.clone(),
            email: d.email.clone(),
            version: d.version.clone(),
            description: d.description.clone(),
            license: d.license.clone(),
            capabilities: d.iter_caps().iter().map(ToString::to_string).collect(),
            config: d.config.iter().map(ValueInfo::from).collect(),
        }
    }
}

/// One field of a configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueInfo {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Schema default; masked defaults are hidden.
    pub default: RawValue,
    pub required: bool,
    pub masked: bool,
    pub transient: bool,
    pub choices: Option<Vec<(String, String)>>,
}

impl From<&Value> for ValueInfo {
    fn from(v: &Value) -> Self {
        let default = if v.is_masked() && !v.default_value().is_null() {
            RawValue::String(MASK.to_string())
        } else {
            v.default_value().clone()
        };
        Self {
            id: v.id().to_string(),
            label: v.label_text().map(str::to_string),
            description: v.description_text().map(str::to_string),
            default,
            required: v.is_required(),
            masked: v.is_masked(),
            transient: v.is_transient(),
            choices: v.choice_entries().map(<[_]>::to_vec),
        }
    }
}

/// A configured backend instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    pub name: String,
    pub module: String,
    /// Whether the module is registered in this application.
    pub module_available: bool,
    /// Whether the instance is currently loaded.
    pub loaded: bool,
    /// Stored parameters, masked fields replaced by a placeholder.
    pub params: Params,
}

impl BackendInfo {
    /// Build from a stored entry; `schema` (when the module is known) tells
    /// which fields to mask.
    pub fn new(entry: &BackendEntry, schema: Option<&ModuleDescriptor>, loaded: bool) -> Self {
        let params = entry
            .params
            .iter()
            .map(|(key, value)| {
                let masked = schema
                    .and_then(|d| d.config.get(key))
                    .is_some_and(Value::is_masked);
                let shown = if masked && value.as_str().is_some_and(|s| !s.is_empty()) {
                    RawValue::String(MASK.to_string())
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect();
        Self {
            name: entry.name.clone(),
            module: entry.module.clone(),
            module_available: schema.is_some(),
            loaded,
            params,
        }
    }

    /// Parameters that are schema fields, private `_` keys left out.
    pub fn public_params(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.params.iter().filter(|(k, _)| !is_private_param(k))
    }
}

/// Instance that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a bootstrap load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Instance names now loaded, ordered.
    pub loaded: Vec<String>,
    pub errors: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn success_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use scrapehub_module::BackendConfig;
    use scrapehub_module::caps::CAP_BANK_WEALTH;

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor::new("cragr")
            .caps([CAP_BANK_WEALTH])
            .config(BackendConfig::schema([
                Value::new("login").label("Identifier"),
                Value::backend_password("password"),
            ]))
    }

    #[test]
    fn module_info_flattens_caps() {
        let info = ModuleInfo::from(&descriptor());
        assert_eq!(info.capabilities, vec!["CapBankWealth", "CapBank"]);
        assert_eq!(info.config.len(), 2);
        assert_eq!(info.config[0].label.as_deref(), Some("Identifier"));
        assert!(info.config[1].masked);
    }

    #[test]
    fn backend_info_masks_passwords() {
        let entry = BackendEntry {
            name: "mybank".to_string(),
            module: "cragr".to_string(),
            params: [
                ("login".to_string(), json!("bob")),
                ("password".to_string(), json!("hunter2")),
                ("_proxy".to_string(), json!("http://p")),
            ]
            .into_iter()
            .collect(),
        };
        let info = BackendInfo::new(&entry, Some(&descriptor()), false);
        assert!(info.module_available);
        assert_eq!(info.params["password"], json!(MASK));
        assert_eq!(info.params["login"], json!("bob"));
        assert_eq!(info.public_params().count(), 2);

        let unknown = BackendInfo::new(&entry, None, false);
        assert!(!unknown.module_available);
    }

    #[test]
    fn serialize_camel_case() {
        let json = serde_json::to_value(LoadReport::default()).unwrap();
        assert_eq!(json, json!({ "loaded": [], "errors": [] }));
    }
}
