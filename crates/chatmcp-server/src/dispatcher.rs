//! Routes a validated JSON-RPC request to the handler for its method,
//! running the request through the middleware pipeline with the resolved
//! manifest (if any) attached to the middleware context.

use crate::autocomplete::AutocompleteHandler;
use crate::managers::Managers;
use crate::middleware::{EventType, MiddlewareContext, Pipeline};
use chatmcp_core::{Context, Kind};
use chatmcp_protocol::types::{
    CallToolRequestParams, CallToolResult, CompleteRequestParams, GetPromptRequestParams,
    GetPromptResult, Implementation, InitializeRequestParams, InitializeResult,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    LoggingCapability, ReadResourceRequestParams, ReadResourceResult, ResourcesCapability,
    ServerCapabilities, PROTOCOL_VERSION,
};
use chatmcp_protocol::{JsonRpcRequest, McpError, McpResult};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub struct Dispatcher {
    pub managers: Managers,
    pub pipeline: Pipeline,
    pub autocomplete: AutocompleteHandler,
    pub server_name: String,
    pub server_version: String,
    pub instructions: Option<String>,
}

impl Dispatcher {
    /// Route one request end to end: resolve its manifest (if the method
    /// addresses one), run the middleware chain (which calls back into
    /// `handle_method` as its innermost terminal), and serialize the result.
    pub async fn dispatch(self: &Arc<Self>, ctx: &Context, request: &JsonRpcRequest) -> McpResult<Value> {
        let params = request.params.clone().unwrap_or(Value::Null);
        let (manifest_kind, manifest_key) = self.resolve_manifest_ref(&request.method, &params);

        let middleware_ctx = MiddlewareContext {
            method: &request.method,
            event_type: EventType::Request,
            timestamp: Instant::now(),
            context: ctx,
            manifest_kind,
            manifest_key: manifest_key.as_deref(),
            params: &params,
        };

        let dispatcher = self.clone();
        let method = request.method.clone();
        self.pipeline
            .run(&middleware_ctx, move |inner_ctx| {
                let dispatcher = dispatcher.clone();
                let method = method.clone();
                let params = inner_ctx.params.clone();
                let ctx = inner_ctx.context.clone();
                Box::pin(async move { dispatcher.handle_method(&ctx, &method, &params).await })
                    as BoxFuture<'static, McpResult<Value>>
            })
            .await
    }

    fn resolve_manifest_ref(&self, method: &str, params: &Value) -> (Option<Kind>, Option<String>) {
        match method {
            "tools/call" => (Some(Kind::Tool), params.get("name").and_then(Value::as_str).map(String::from)),
            "prompts/get" => (Some(Kind::Prompt), params.get("name").and_then(Value::as_str).map(String::from)),
            "resources/read" => (Some(Kind::Resource), params.get("uri").and_then(Value::as_str).map(String::from)),
            _ => (None, None),
        }
    }

    async fn handle_method(&self, ctx: &Context, method: &str, params: &Value) -> McpResult<Value> {
        match method {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(ctx, params).await,
            "resources/list" => self.list_resources(),
            "resources/templates/list" => self.list_resource_templates(),
            "resources/read" => self.read_resource(ctx, params).await,
            "resources/subscribe" => Ok(json!({})),
            "resources/unsubscribe" => Ok(json!({})),
            "prompts/list" => self.list_prompts(),
            "prompts/get" => self.get_prompt(ctx, params).await,
            "completion/complete" => self.complete(ctx, params).await,
            "logging/setLevel" => Ok(json!({})),
            other => Err(McpError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: &Value) -> McpResult<Value> {
        let _request: InitializeRequestParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::invalid_params(format!("invalid initialize params: {e}")))?;
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                resources: Some(ResourcesCapability::default()),
                prompts: Some(Default::default()),
                logging: Some(LoggingCapability::default()),
                completions: Some(json!({})),
            },
            server_info: Implementation {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
            instructions: self.instructions.clone(),
        };
        serde_json::to_value(result).map_err(McpError::from)
    }

    fn list_tools(&self) -> McpResult<Value> {
        let mut tools = Vec::new();
        for manifest in self.managers.tools.list_enabled() {
            if let Some(tool) = manifest.as_tool() {
                tools.push(tool);
            }
        }
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::to_value(ListToolsResult { tools, next_cursor: None }).map_err(McpError::from)
    }

    async fn call_tool(&self, ctx: &Context, params: &Value) -> McpResult<Value> {
        let request: CallToolRequestParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::invalid_params(format!("invalid tools/call params: {e}")))?;
        let manifest = self
            .managers
            .tools
            .get_enabled(&request.name)
            .ok_or_else(|| McpError::internal(format!("tool '{}' not found", request.name)))?;
        if !manifest.enabled {
            return Err(McpError::disabled(request.name.clone()));
        }
        let arguments = match &manifest.schema {
            Some(schema) => schema.coerce(request.arguments)?,
            None => request.arguments,
        };
        let chatmcp_core::Callback::Tool(callback) = &manifest.callback else {
            return Err(McpError::internal(format!("'{}' is not registered as a tool callback", request.name)));
        };
        let result: CallToolResult = callback.call(ctx, arguments).await?;
        serde_json::to_value(result).map_err(McpError::from)
    }

    fn list_resources(&self) -> McpResult<Value> {
        let mut resources = Vec::new();
        for manifest in self.managers.resources.list_enabled() {
            if manifest.is_resource_template() {
                continue;
            }
            if let Some(extras) = &manifest.resource {
                resources.push(chatmcp_protocol::types::Resource {
                    uri: extras.uri_template.clone(),
                    name: manifest.key.clone(),
                    title: manifest.title.clone(),
                    description: manifest.description.clone(),
                    mime_type: Some(extras.mime_type.clone()),
                    meta: None,
                });
            }
        }
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        serde_json::to_value(ListResourcesResult { resources, next_cursor: None }).map_err(McpError::from)
    }

    fn list_resource_templates(&self) -> McpResult<Value> {
        let mut resource_templates = Vec::new();
        for manifest in self.managers.resources.list_enabled() {
            if !manifest.is_resource_template() {
                continue;
            }
            if let Some(extras) = &manifest.resource {
                resource_templates.push(chatmcp_protocol::types::ResourceTemplate {
                    uri_template: extras.uri_template.clone(),
                    name: manifest.key.clone(),
                    title: manifest.title.clone(),
                    description: manifest.description.clone(),
                    mime_type: Some(extras.mime_type.clone()),
                });
            }
        }
        resource_templates.sort_by(|a, b| a.uri_template.cmp(&b.uri_template));
        serde_json::to_value(ListResourceTemplatesResult {
            resource_templates,
            next_cursor: None,
        })
        .map_err(McpError::from)
    }

    async fn read_resource(&self, ctx: &Context, params: &Value) -> McpResult<Value> {
        let request: ReadResourceRequestParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::invalid_params(format!("invalid resources/read params: {e}")))?;
        self.read_resource_for_context(ctx, &request.uri).await
    }

    /// Read one resource outside the normal dispatch path, e.g. when a tool
    /// callback calls `Context::read_resource` mid-request.
    pub async fn read_resource_for_context(&self, ctx: &Context, uri: &str) -> McpResult<Value> {
        let (manifest, path_params) = self.resolve_resource(uri)?;
        if !manifest.enabled {
            return Err(McpError::disabled(uri.to_string()));
        }
        let chatmcp_core::Callback::Resource(callback) = &manifest.callback else {
            return Err(McpError::internal(format!("'{uri}' is not registered as a resource callback")));
        };
        let result: ReadResourceResult = callback.read(ctx, uri, path_params).await?;
        serde_json::to_value(result).map_err(McpError::from)
    }

    /// Find the manifest matching `uri`: exact match first, then each
    /// template, extracting `{param}` segment values positionally.
    fn resolve_resource(&self, uri: &str) -> McpResult<(std::sync::Arc<chatmcp_core::Manifest>, HashMap<String, String>)> {
        if let Some(manifest) = self.managers.resources.get_enabled(uri) {
            if !manifest.is_resource_template() {
                return Ok((manifest, HashMap::new()));
            }
        }
        for manifest in self.managers.resources.list_enabled() {
            if !manifest.is_resource_template() {
                continue;
            }
            let Some(extras) = &manifest.resource else { continue };
            if let Some(params) = match_template(&extras.uri_template, uri) {
                return Ok((manifest, params));
            }
        }
        Err(McpError::resource_not_found(uri))
    }

    fn list_prompts(&self) -> McpResult<Value> {
        let mut prompts = Vec::new();
        for manifest in self.managers.prompts.list_enabled() {
            let arguments = manifest.prompt.as_ref().map(|p| p.arguments.clone()).unwrap_or_default();
            prompts.push(chatmcp_protocol::types::Prompt {
                name: manifest.key.clone(),
                title: manifest.title.clone(),
                description: manifest.description.clone(),
                arguments,
            });
        }
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::to_value(ListPromptsResult { prompts, next_cursor: None }).map_err(McpError::from)
    }

    async fn get_prompt(&self, ctx: &Context, params: &Value) -> McpResult<Value> {
        let request: GetPromptRequestParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::invalid_params(format!("invalid prompts/get params: {e}")))?;
        let manifest = self
            .managers
            .prompts
            .get_enabled(&request.name)
            .ok_or_else(|| McpError::prompt_not_found(request.name.clone()))?;
        let chatmcp_core::Callback::Prompt(callback) = &manifest.callback else {
            return Err(McpError::internal(format!("'{}' is not registered as a prompt callback", request.name)));
        };
        let result: GetPromptResult = callback.render(ctx, request.arguments).await?;
        serde_json::to_value(result).map_err(McpError::from)
    }

    async fn complete(&self, ctx: &Context, params: &Value) -> McpResult<Value> {
        let request: CompleteRequestParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::invalid_params(format!("invalid completion/complete params: {e}")))?;
        let completion = self
            .autocomplete
            .complete(
                ctx,
                &self.managers.prompts,
                &self.managers.resources,
                &request.reference,
                &request.argument.name,
                &request.argument.value,
                &request.context,
            )
            .await?;
        serde_json::to_value(chatmcp_protocol::types::CompleteResult { completion }).map_err(McpError::from)
    }
}

/// Match `uri` against `template` (e.g. `guild://{guild_id}/channels`),
/// extracting placeholder values by splitting on `/` and comparing segment
/// by segment.
fn match_template(template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let template_segments: Vec<&str> = template.split('/').collect();
    let uri_segments: Vec<&str> = uri.split('/').collect();
    if template_segments.len() != uri_segments.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (t, u) in template_segments.iter().zip(uri_segments.iter()) {
        if let Some(name) = t.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            params.insert(name.to_string(), u.to_string());
        } else if t != u {
            return None;
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_template_extracts_placeholders() {
        let params = match_template("guild://{guild_id}/channels/{channel_id}", "guild://123/channels/456").unwrap();
        assert_eq!(params.get("guild_id"), Some(&"123".to_string()));
        assert_eq!(params.get("channel_id"), Some(&"456".to_string()));
    }

    #[test]
    fn match_template_rejects_literal_segment_mismatch() {
        assert!(match_template("guild://{guild_id}/channels", "role://123/channels").is_none());
    }
}
