//! `tools/list` and `tools/call` payloads.

use super::content::ContentBlock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Hints a tool gives clients about how it behaves, never enforced by the
/// engine itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
}

/// JSON-Schema describing a tool's arguments, generated from a callback's
/// signature plus its docstring at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(serde_json::Map::new()),
            required: Vec::new(),
        }
    }
}

/// JSON-Schema describing a tool's structured return value, when it has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

/// One entry in the `tools/list` response, also used to advertise a tool's
/// shape to clients before it is ever called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<ToolOutputSchema>,
    #[serde(default, skip_serializing_if = "is_default_annotations")]
    pub annotations: ToolAnnotations,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

fn is_default_annotations(a: &ToolAnnotations) -> bool {
    a.title.is_none()
        && a.destructive_hint.is_none()
        && a.idempotent_hint.is_none()
        && a.open_world_hint.is_none()
        && a.read_only_hint.is_none()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequestParams {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, Value>,
}

/// Result of `tools/call`. `is_error` distinguishes a tool-level failure
/// (still a JSON-RPC success response, content describes the failure) from a
/// protocol-level error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: true,
        }
    }

    pub fn structured(content: Vec<ContentBlock>, structured: Value) -> Self {
        Self {
            content,
            structured_content: Some(structured),
            is_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_with_no_annotations_omits_the_field() {
        let tool = Tool {
            name: "get_latency".into(),
            title: Some("Get Latency".into()),
            description: Some("Reports gateway latency".into()),
            input_schema: ToolInputSchema::default(),
            output_schema: None,
            annotations: ToolAnnotations::default(),
            meta: None,
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("annotations").is_none());
        assert_eq!(value["inputSchema"]["type"], "object");
    }

    #[test]
    fn call_tool_result_omits_is_error_when_false() {
        let result = CallToolResult::text("ok");
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("isError").is_none());
    }
}
