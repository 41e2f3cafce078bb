//! Backend configuration: a module schema and its per-instance bindings.

use std::collections::BTreeMap;
use std::ops::Index;

use serde_json::Value as RawValue;

use crate::context::Context;
use crate::error::{ConfigError, ModuleError, Result};
use crate::value::{Value, ValuesDict};

/// Raw parameters of a backend instance, as persisted.
pub type Params = BTreeMap<String, RawValue>;

/// Whether a parameter is private to the framework (`_proxy`, ...) rather
/// than a schema field.
pub fn is_private_param(key: &str) -> bool {
    key.starts_with('_')
}

/// Ordered set of values, either a module schema or bound to an instance.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    values: ValuesDict,
    modname: Option<String>,
    instname: Option<String>,
    ctx: Option<Context>,
}

impl BackendConfig {
    /// Schema declaration.
    pub fn schema(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: ValuesDict::new(values),
            ..Self::default()
        }
    }

    /// Bind `params` for the instance `instname` of module `modname`.
    ///
    /// The schema is left untouched; every field of the result is a copy.
    /// Missing required fields and invalid values fail unless `nofail` is
    /// set, in which case the field keeps its default.
    pub fn load(
        &self,
        ctx: &Context,
        modname: &str,
        instname: &str,
        params: &Params,
        nofail: bool,
    ) -> std::result::Result<Self, ConfigError> {
        let mut values = ValuesDict::default();

        for field in &self.values {
            let supplied = params.get(field.id()).filter(|v| !v.is_null());
            let value = match supplied {
                Some(v) => v.clone(),
                None if field.is_required() && !nofail => {
                    return Err(ConfigError::missing(
                        instname,
                        field.id(),
                        field.description_text().map(str::to_string),
                    ));
                }
                None => field.default_value().clone(),
            };

            let mut bound = field.clone();
            if let Err(e) = bound.load(instname, value, ctx.requests()) {
                if !nofail {
                    return Err(ConfigError::invalid(
                        instname,
                        field.id(),
                        field.description_text().map(str::to_string),
                        e,
                    ));
                }
                log::debug!("[{instname}] Ignoring invalid field \"{}\": {e}", field.id());
            }
            values.insert(bound);
        }

        Ok(Self {
            values,
            modname: Some(modname.to_string()),
            instname: Some(instname.to_string()),
            ctx: Some(ctx.clone()),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.instname.is_some()
    }

    pub fn modname(&self) -> Option<&str> {
        self.modname.as_deref()
    }

    pub fn instname(&self) -> Option<&str> {
        self.instname.as_deref()
    }

    pub fn values(&self) -> &ValuesDict {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValuesDict {
        &mut self.values
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.values.get_mut(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Persistable parameters; transient and unset fields are left out.
    pub fn dump(&self) -> Params {
        self.values
            .iter()
            .filter(|v| !v.is_transient())
            .map(|v| (v.id().to_string(), v.dump()))
            .filter(|(_, v)| !v.is_null())
            .collect()
    }

    /// Persist the bound configuration through the backends config.
    ///
    /// `extra_params` override dumped values (typically private `_` keys).
    /// Without `edit`, saving an existing instance fails.
    pub fn save(&self, edit: bool, extra_params: Option<&Params>) -> Result<()> {
        let (Some(modname), Some(instname), Some(ctx)) =
            (&self.modname, &self.instname, &self.ctx)
        else {
            return Err(ModuleError::NotBound);
        };

        let mut params = self.dump();
        if let Some(extra) = extra_params {
            params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        ctx.backends_config()?
            .add_backend(instname, modname, &params, edit)?;
        log::debug!("[{instname}] Configuration saved (edit: {edit})");
        Ok(())
    }
}

impl Index<&str> for BackendConfig {
    type Output = Value;

    fn index(&self, id: &str) -> &Value {
        &self.values[id]
    }
}

impl<'a> IntoIterator for &'a BackendConfig {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
