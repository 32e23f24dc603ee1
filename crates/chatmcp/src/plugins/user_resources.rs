//! User lookup, a `user://{user_id}` resource with id autocompletion, and a
//! rate-limited latency probe — grounded in the original bot's
//! `get_current_user` / `get_user_by_id` / `get_user_resource` / `get_latency`
//! tools.

use crate::Plugin;
use async_trait::async_trait;
use chatmcp_core::manifest::{Callback, ResourceExtras, ToolExtras};
use chatmcp_core::schema::{ArgSchema, ParamSchema, ParamType};
use chatmcp_core::{Check, Context, CooldownConfig, Kind, Manifest, ResourceCallback, ToolCallback};
use chatmcp_protocol::types::{CallToolResult, ContentBlock, ReadResourceResult, ResourceContents};
use chatmcp_protocol::{McpError, McpResult};
use chatmcp_server::autocomplete::AutocompleteCallback;
use chatmcp_server::error::ServerError;
use chatmcp_server::ServerBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Mirrors the original bot's `has_bot_user` predicate: refuses the call if
/// the platform client has no bot-user object cached yet.
struct HasBotUserCheck;

#[async_trait]
impl Check for HasBotUserCheck {
    async fn evaluate(&self, ctx: &Context) -> McpResult<bool> {
        Ok(ctx.platform().raw_object("self_user", "").await?.is_some())
    }

    fn name(&self) -> &str {
        "has_bot_user"
    }
}

struct GetCurrentUser;

#[async_trait]
impl ToolCallback for GetCurrentUser {
    async fn call(&self, ctx: &Context, _arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let raw = ctx
            .platform()
            .raw_object("self_user", "")
            .await?
            .ok_or_else(|| McpError::internal("bot user is not available yet"))?;
        Ok(CallToolResult::structured(vec![ContentBlock::text("current bot user")], raw))
    }
}

struct GetUserById;

#[async_trait]
impl ToolCallback for GetUserById {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let user_id = arguments["user_id"].as_str().unwrap_or_default();
        match ctx.platform().user(user_id).await? {
            Some(user) => {
                let value = serde_json::to_value(&user)?;
                Ok(CallToolResult::structured(vec![ContentBlock::text(user.username.clone())], value))
            }
            None => Ok(CallToolResult::error(format!("no user with id '{user_id}'"))),
        }
    }
}

struct UserResource;

#[async_trait]
impl ResourceCallback for UserResource {
    async fn read(&self, ctx: &Context, uri: &str, params: HashMap<String, String>) -> McpResult<ReadResourceResult> {
        let user_id = params.get("user_id").map(String::as_str).unwrap_or_default();
        let user = ctx
            .platform()
            .user(user_id)
            .await?
            .ok_or_else(|| McpError::resource_not_found(uri.to_string()))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: Some(serde_json::to_string(&user)?),
                blob: None,
            }],
        })
    }
}

/// Completes `user_id` against every cached user whose username contains the
/// current value, capped at 10 results.
struct UserIdAutocomplete;

#[async_trait]
impl AutocompleteCallback for UserIdAutocomplete {
    async fn complete(&self, ctx: &Context, current_value: &str, _context_args: &HashMap<String, String>) -> McpResult<Value> {
        let needle = current_value.to_lowercase();
        let users = ctx
            .platform()
            .raw_object("users", "")
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        let matches: Vec<Value> = users
            .into_iter()
            .filter(|u| {
                u.get("username")
                    .and_then(Value::as_str)
                    .map(|name| name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .take(10)
            .filter_map(|u| u.get("id").cloned())
            .collect();
        Ok(Value::Array(matches))
    }
}

struct GetLatency;

#[async_trait]
impl ToolCallback for GetLatency {
    async fn call(&self, ctx: &Context, _arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let latency_ms = ctx
            .platform()
            .raw_object("latency", "")
            .await?
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Ok(CallToolResult::text(format!("{latency_ms:.2}ms")))
    }
}

pub struct UserResourcesPlugin;

#[async_trait]
impl Plugin for UserResourcesPlugin {
    fn name(&self) -> &str {
        "user_resources"
    }

    fn register(&self, builder: ServerBuilder) -> Result<ServerBuilder, ServerError> {
        let builder = builder
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "user_get_current".to_string(),
                title: Some("Get Current User".to_string()),
                description: Some("The bot's own user object.".to_string()),
                callback: Callback::Tool(Arc::new(GetCurrentUser)),
                enabled: true,
                checks: vec![Arc::new(HasBotUserCheck) as Arc<dyn Check>],
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: None,
            })?
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "user_get_by_id".to_string(),
                title: Some("Get User".to_string()),
                description: Some("Look up a single user by id.".to_string()),
                callback: Callback::Tool(Arc::new(GetUserById)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: Some(ArgSchema::new(vec![ParamSchema::new("user_id", ParamType::String)
                    .describe("The user id to look up")])),
            })?
            .register_manifest(Manifest {
                kind: Kind::Resource,
                key: "user://{user_id}".to_string(),
                title: Some("User".to_string()),
                description: Some("A single user, addressed by id.".to_string()),
                callback: Callback::Resource(Arc::new(UserResource)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: None,
                resource: Some(ResourceExtras {
                    uri_template: "user://{user_id}".to_string(),
                    mime_type: "application/json".to_string(),
                    is_template: true,
                }),
                prompt: None,
                autocomplete_args: vec!["user_id".to_string()],
                schema: None,
            })?
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "user_get_latency".to_string(),
                title: Some("Get Latency".to_string()),
                description: Some("Current gateway latency, in milliseconds.".to_string()),
                callback: Callback::Tool(Arc::new(GetLatency)),
                enabled: true,
                checks: Vec::new(),
                cooldown: Some(CooldownConfig::fixed_window(1, 180.0)),
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: None,
            })?;

        Ok(builder.register_autocomplete(Kind::Resource, "user://{user_id}", "user_id", Arc::new(UserIdAutocomplete)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmcp_server::testing::{test_context, test_server_builder};

    #[tokio::test]
    async fn get_user_by_id_returns_structured_user() {
        let (_builder, platform) = test_server_builder("test");
        platform.insert_user(chatmcp_core::User {
            id: "u1".to_string(),
            username: "ada".to_string(),
            bot: false,
        });
        let (ctx, _access) = test_context(platform);
        let mut args = HashMap::new();
        args.insert("user_id".to_string(), Value::String("u1".to_string()));
        let result = GetUserById.call(&ctx, args).await.unwrap();
        assert_eq!(result.structured_content.unwrap()["username"], "ada");
    }

    #[tokio::test]
    async fn has_bot_user_check_fails_without_a_cached_self_user() {
        let (_builder, platform) = test_server_builder("test");
        let (ctx, _access) = test_context(platform);
        assert!(!HasBotUserCheck.evaluate(&ctx).await.unwrap());
    }
}
