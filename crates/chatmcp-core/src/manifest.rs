//! Declarative records describing one tool, resource, or prompt plus the
//! callback behind it. Manifests are discovered at startup and, once placed
//! in a [`crate::registry::Registry`], never mutate again.

use crate::context::Context;
use crate::rate_limit::CooldownConfig;
use async_trait::async_trait;
use chatmcp_protocol::types::{CallToolResult, GetPromptResult, ReadResourceResult, Tool};
use chatmcp_protocol::McpResult;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which registry a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Tool => write!(f, "tool"),
            Kind::Resource => write!(f, "resource"),
            Kind::Prompt => write!(f, "prompt"),
        }
    }
}

/// A predicate run before a callback is invoked. Returning `Ok(false)` or
/// `Err` both abort the call with `ErrorKind::CheckFailure` /
/// `ErrorKind::PermissionDenied` respectively, depending on which the check
/// itself raises.
#[async_trait]
pub trait Check: Send + Sync {
    async fn evaluate(&self, ctx: &Context) -> McpResult<bool>;

    /// Human-readable name used in the `check failed: {predicate}` message.
    fn name(&self) -> &str;
}

#[async_trait]
pub trait ToolCallback: Send + Sync {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult>;
}

#[async_trait]
pub trait ResourceCallback: Send + Sync {
    async fn read(&self, ctx: &Context, uri: &str, params: HashMap<String, String>) -> McpResult<ReadResourceResult>;
}

#[async_trait]
pub trait PromptCallback: Send + Sync {
    async fn render(&self, ctx: &Context, arguments: HashMap<String, String>) -> McpResult<GetPromptResult>;
}

/// Tool-specific manifest extras.
#[derive(Clone, Default)]
pub struct ToolExtras {
    pub annotations: chatmcp_protocol::types::ToolAnnotations,
    pub structured_output: bool,
}

/// Resource-specific manifest extras. `uri_template` holds the raw
/// `{param}`-bearing URI for templated resources, or the concrete URI for a
/// single resource.
#[derive(Clone)]
pub struct ResourceExtras {
    pub uri_template: String,
    pub mime_type: String,
    pub is_template: bool,
}

/// Prompt-specific manifest extras.
#[derive(Clone, Default)]
pub struct PromptExtras {
    pub arguments: Vec<chatmcp_protocol::types::PromptArgument>,
}

pub enum Callback {
    Tool(Arc<dyn ToolCallback>),
    Resource(Arc<dyn ResourceCallback>),
    Prompt(Arc<dyn PromptCallback>),
}

/// One declarative tool/resource/prompt record. Immutable once registered.
pub struct Manifest {
    pub kind: Kind,
    /// Unique key within `kind`: tool/prompt name, or resource URI/template.
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub callback: Callback,
    pub enabled: bool,
    pub checks: Vec<Arc<dyn Check>>,
    pub cooldown: Option<CooldownConfig>,
    pub tool: Option<ToolExtras>,
    pub resource: Option<ResourceExtras>,
    pub prompt: Option<PromptExtras>,
    /// Argument/placeholder names with a registered autocomplete callback.
    pub autocomplete_args: Vec<String>,
    /// Declared parameter shape, used to build `inputSchema` and to coerce
    /// incoming arguments. `None` for a zero-argument tool or a resource
    /// whose only "parameters" are URI template placeholders.
    pub schema: Option<crate::schema::ArgSchema>,
}

impl Manifest {
    /// The set of `{param}` placeholders in a resource template's URI.
    pub fn template_placeholders(uri_template: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut chars = uri_template.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '{' {
                if let Some(end) = uri_template[i..].find('}') {
                    names.push(uri_template[i + 1..i + end].to_string());
                }
            }
        }
        names
    }

    pub fn is_resource_template(&self) -> bool {
        self.resource.as_ref().map(|r| r.is_template).unwrap_or(false)
    }

    pub fn as_tool(&self) -> Option<Tool> {
        let extras = self.tool.as_ref()?;
        let input_schema = match &self.schema {
            Some(schema) => {
                let (properties, required) = schema.to_json_schema();
                chatmcp_protocol::types::ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required,
                }
            }
            None => chatmcp_protocol::types::ToolInputSchema::default(),
        };
        Some(Tool {
            name: self.key.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema,
            output_schema: None,
            annotations: extras.annotations.clone(),
            meta: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders_extracts_braced_names() {
        let names = Manifest::template_placeholders("guild://{guild_id}/channels/{channel_id}");
        assert_eq!(names, vec!["guild_id".to_string(), "channel_id".to_string()]);
    }

    #[test]
    fn template_with_no_braces_has_no_placeholders() {
        assert!(Manifest::template_placeholders("guild://static").is_empty());
    }
}
