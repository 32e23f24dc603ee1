//! Type-driven JSON-Schema generation and argument coercion.
//!
//! A dynamically-typed host can read a callback's parameter annotations at
//! runtime to build a schema and coerce arguments; Rust can't. The
//! equivalent here is a small `ParamSchema` builder a plugin fills in once
//! at registration (by hand, or from a derive macro a plugin crate could add
//! later), which plays the role the runtime-introspected signature does in
//! the source system: it describes each parameter's declared type, and
//! drives the same string→typed coercion rules.

use chatmcp_protocol::{McpError, McpResult};
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// The declared type of one callback parameter. `Json` covers arrays and
/// objects: coercion for those parses the incoming string as JSON wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Json,
}

impl ParamType {
    fn json_schema_type(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "number",
            ParamType::Boolean => "boolean",
            ParamType::Json => "object",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSchema {
    pub name: String,
    pub param_type: ParamType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSchema {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: true,
            default: None,
        }
    }

    pub fn optional(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The full declared parameter set for one callback, built once at
/// registration and reused for both schema generation and coercion.
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    pub params: Vec<ParamSchema>,
}

impl ArgSchema {
    pub fn new(params: Vec<ParamSchema>) -> Self {
        Self { params }
    }

    /// Build the `inputSchema` JSON-Schema object, merging each parameter's
    /// description (short description merge happens at the manifest level,
    /// from the callback's own docstring-equivalent).
    pub fn to_json_schema(&self) -> (Value, Vec<String>) {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(param.param_type.json_schema_type().into()));
            if let Some(description) = &param.description {
                prop.insert("description".into(), Value::String(description.clone()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(param.name.clone());
            }
        }
        (Value::Object(properties), required)
    }

    /// Coerce a string-valued incoming argument map into a typed map,
    /// following the four-step rule: strings and untyped params pass
    /// through; non-string values pass through as already typed; otherwise
    /// parse as JSON against the declared type, falling back to direct
    /// validation; failure names the offending parameter.
    pub fn coerce(&self, mut raw: HashMap<String, Value>) -> McpResult<HashMap<String, Value>> {
        let mut out = HashMap::with_capacity(self.params.len());
        for param in &self.params {
            let incoming = raw.remove(&param.name);
            let value = match incoming {
                None => {
                    if param.required {
                        return Err(McpError::invalid_params(format!(
                            "missing required parameter '{}'",
                            param.name
                        )));
                    }
                    param.default.clone().unwrap_or(Value::Null)
                }
                Some(value) => coerce_one(param, value)?,
            };
            out.insert(param.name.clone(), value);
        }
        Ok(out)
    }
}

fn coerce_one(param: &ParamSchema, value: Value) -> McpResult<Value> {
    if param.param_type == ParamType::String {
        return Ok(value);
    }
    let Value::String(raw) = &value else {
        // Already typed (e.g. HTTP/JSON transports send real numbers).
        return Ok(value);
    };
    match param.param_type {
        ParamType::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .or_else(|_| serde_json::from_str::<Value>(raw))
            .map_err(|_| coercion_error(&param.name, raw)),
        ParamType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| coercion_error(&param.name, raw)),
        ParamType::Boolean => match raw.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => serde_json::from_str::<Value>(raw)
                .ok()
                .filter(Value::is_boolean)
                .ok_or_else(|| coercion_error(&param.name, raw)),
        },
        ParamType::Json => serde_json::from_str(raw).map_err(|_| coercion_error(&param.name, raw)),
        ParamType::String => unreachable!(),
    }
}

fn coercion_error(name: &str, observed: &str) -> McpError {
    McpError::invalid_params(format!("parameter '{name}' rejected value '{observed}'"))
}

/// Caches coerced adapters by callback identity so repeat calls to the same
/// tool/resource/prompt don't re-walk the schema. Reference capacity ~5000
/// entries, evicted LRU.
pub struct AdapterCache {
    inner: Mutex<LruCache<String, Arc<ArgSchema>>>,
}

impl AdapterCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get_or_insert_with(&self, key: &str, build: impl FnOnce() -> ArgSchema) -> Arc<ArgSchema> {
        let mut cache = self.inner.lock();
        if let Some(existing) = cache.get(key) {
            return existing.clone();
        }
        let schema = Arc::new(build());
        cache.put(key.to_string(), schema.clone());
        schema
    }
}

impl Default for AdapterCache {
    fn default() -> Self {
        Self::new(5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_string_to_integer() {
        let schema = ArgSchema::new(vec![
            ParamSchema::new("a", ParamType::Integer),
            ParamSchema::new("b", ParamType::Integer),
        ]);
        let mut raw = HashMap::new();
        raw.insert("a".to_string(), Value::String("2".to_string()));
        raw.insert("b".to_string(), Value::String("3".to_string()));
        let coerced = schema.coerce(raw).unwrap();
        assert_eq!(coerced["a"], Value::from(2));
        assert_eq!(coerced["b"], Value::from(3));
    }

    #[test]
    fn already_typed_values_pass_through() {
        let schema = ArgSchema::new(vec![ParamSchema::new("n", ParamType::Integer)]);
        let mut raw = HashMap::new();
        raw.insert("n".to_string(), Value::from(42));
        let coerced = schema.coerce(raw).unwrap();
        assert_eq!(coerced["n"], Value::from(42));
    }

    #[test]
    fn bad_value_names_the_parameter() {
        let schema = ArgSchema::new(vec![ParamSchema::new("n", ParamType::Integer)]);
        let mut raw = HashMap::new();
        raw.insert("n".to_string(), Value::String("not-a-number".to_string()));
        let err = schema.coerce(raw).unwrap_err();
        assert!(err.message.contains('n'));
        assert_eq!(err.kind, chatmcp_protocol::ErrorKind::InvalidParams);
    }

    #[test]
    fn missing_required_parameter_is_invalid_params() {
        let schema = ArgSchema::new(vec![ParamSchema::new("n", ParamType::Integer)]);
        let err = schema.coerce(HashMap::new()).unwrap_err();
        assert_eq!(err.kind, chatmcp_protocol::ErrorKind::InvalidParams);
    }

    #[test]
    fn optional_parameter_falls_back_to_default() {
        let schema = ArgSchema::new(vec![ParamSchema::new("n", ParamType::Integer).optional(Value::from(7))]);
        let coerced = schema.coerce(HashMap::new()).unwrap();
        assert_eq!(coerced["n"], Value::from(7));
    }

    #[test]
    fn adapter_cache_reuses_existing_entry() {
        let cache = AdapterCache::new(2);
        let mut builds = 0;
        cache.get_or_insert_with("add", || {
            builds += 1;
            ArgSchema::default()
        });
        cache.get_or_insert_with("add", || {
            builds += 1;
            ArgSchema::default()
        });
        assert_eq!(builds, 1);
    }
}
