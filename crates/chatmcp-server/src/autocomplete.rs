//! Completion-callback dispatch for `completion/complete`.
//!
//! Each Prompt or Resource-template manifest owns a map from argument name
//! to a callback that produces candidate values. Registration happens once
//! at startup (`manifest.autocomplete(arg_name, callback)`), validated
//! against the manifest's declared shape.

use async_trait::async_trait;
use chatmcp_core::{Context, Kind, Registry};
use chatmcp_protocol::types::{Completion, CompletionContext, CompletionReference};
use chatmcp_protocol::{McpError, McpResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A single registered autocomplete callback. `manifest_key` is the prompt
/// name or resource template URI it's attached to; `arg_name` is the
/// parameter it completes.
#[async_trait]
pub trait AutocompleteCallback: Send + Sync {
    async fn complete(
        &self,
        ctx: &Context,
        current_value: &str,
        context_args: &HashMap<String, String>,
    ) -> McpResult<Value>;
}

/// Wraps a raw callback result into the wire `Completion` shape, the same
/// way regardless of what scalar/sequence/mapping shape the callback
/// returned.
pub fn wrap_result(result: Value) -> Completion {
    match result {
        Value::Array(items) => Completion::values(items.into_iter().map(stringify).collect()),
        Value::Object(map) => Completion::values(map.into_values().map(stringify).collect()),
        other => Completion::values(vec![stringify(other)]),
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Per-manifest-kind autocomplete registry: (manifest key, arg name) →
/// callback. Prompts and resource templates share this one table, keyed by
/// `Kind` so a prompt argument and a resource template argument with the
/// same names never collide.
#[derive(Default)]
pub struct AutocompleteHandler {
    callbacks: dashmap::DashMap<(Kind, String, String), Arc<dyn AutocompleteCallback>>,
}

impl AutocompleteHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: Kind, manifest_key: impl Into<String>, arg_name: impl Into<String>, callback: Arc<dyn AutocompleteCallback>) {
        self.callbacks.insert((kind, manifest_key.into(), arg_name.into()), callback);
    }

    /// Resolve the reference to its live manifest, locate the callback for
    /// the completed argument, and run it.
    pub async fn complete(
        &self,
        ctx: &Context,
        prompts: &Registry,
        resource_templates: &Registry,
        reference: &CompletionReference,
        argument_name: &str,
        argument_value: &str,
        context_args: &CompletionContext,
    ) -> McpResult<Completion> {
        let (kind, key) = match reference {
            CompletionReference::Prompt { name } => {
                if prompts.get_enabled(name).is_none() {
                    return Err(McpError::internal(format!("no live manifest for prompt reference '{name}'")));
                }
                (Kind::Prompt, name.clone())
            }
            CompletionReference::Resource { uri } => {
                if resource_templates.get_enabled(uri).is_none() {
                    return Err(McpError::internal(format!("no live manifest for resource template reference '{uri}'")));
                }
                (Kind::Resource, uri.clone())
            }
        };

        let callback = self
            .callbacks
            .get(&(kind, key.clone(), argument_name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                McpError::internal(format!(
                    "no autocomplete callback registered for argument '{argument_name}' on '{key}'"
                ))
            })?;

        let result = callback.complete(ctx, argument_value, &context_args.arguments).await?;
        Ok(wrap_result(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_array_results_by_stringifying_each_element() {
        let completion = wrap_result(serde_json::json!(["a", 1, true]));
        assert_eq!(completion.values, vec!["a", "1", "true"]);
    }

    #[test]
    fn wraps_scalar_result_as_single_value() {
        let completion = wrap_result(serde_json::json!("only"));
        assert_eq!(completion.values, vec!["only".to_string()]);
    }
}
