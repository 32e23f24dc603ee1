//! Guild lookup tools and a `guild://{guild_id}` resource.

use crate::Plugin;
use async_trait::async_trait;
use chatmcp_core::manifest::{Callback, ResourceExtras, ToolExtras};
use chatmcp_core::schema::{ArgSchema, ParamSchema, ParamType};
use chatmcp_core::{Context, Kind, Manifest, ResourceCallback, ToolCallback};
use chatmcp_protocol::types::{CallToolResult, ReadResourceResult, ResourceContents};
use chatmcp_protocol::McpResult;
use chatmcp_server::error::ServerError;
use chatmcp_server::ServerBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

struct GetGuild;

#[async_trait]
impl ToolCallback for GetGuild {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let guild_id = arguments["guild_id"].as_str().unwrap_or_default();
        match ctx.platform().guild(guild_id).await? {
            Some(guild) => {
                let value = serde_json::to_value(&guild)?;
                Ok(CallToolResult::structured(
                    vec![chatmcp_protocol::types::ContentBlock::text(format!(
                        "{} ({})",
                        guild.name, guild.id
                    ))],
                    value,
                ))
            }
            None => Ok(CallToolResult::error(format!("no guild with id '{guild_id}'"))),
        }
    }
}

struct ListGuilds;

#[async_trait]
impl ToolCallback for ListGuilds {
    async fn call(&self, ctx: &Context, _arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let guilds = ctx.platform().guilds().await?;
        let value = serde_json::to_value(&guilds)?;
        Ok(CallToolResult::structured(
            vec![chatmcp_protocol::types::ContentBlock::text(format!("{} guild(s)", guilds.len()))],
            value,
        ))
    }
}

struct GuildResource;

#[async_trait]
impl ResourceCallback for GuildResource {
    async fn read(&self, ctx: &Context, uri: &str, params: HashMap<String, String>) -> McpResult<ReadResourceResult> {
        let guild_id = params.get("guild_id").map(String::as_str).unwrap_or_default();
        let guild = ctx
            .platform()
            .guild(guild_id)
            .await?
            .ok_or_else(|| chatmcp_protocol::McpError::resource_not_found(uri.to_string()))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: Some(serde_json::to_string(&guild)?),
                blob: None,
            }],
        })
    }
}

pub struct GuildToolsPlugin;

#[async_trait]
impl Plugin for GuildToolsPlugin {
    fn name(&self) -> &str {
        "guild_tools"
    }

    fn register(&self, builder: ServerBuilder) -> Result<ServerBuilder, ServerError> {
        builder
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "guild_get".to_string(),
                title: Some("Get Guild".to_string()),
                description: Some("Look up a single guild by id.".to_string()),
                callback: Callback::Tool(Arc::new(GetGuild)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: Some(ArgSchema::new(vec![ParamSchema::new("guild_id", ParamType::String)
                    .describe("The guild id to look up")])),
            })?
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "guild_list".to_string(),
                title: Some("List Guilds".to_string()),
                description: Some("List every guild the bot is a member of.".to_string()),
                callback: Callback::Tool(Arc::new(ListGuilds)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: None,
            })?
            .register_manifest(Manifest {
                kind: Kind::Resource,
                key: "guild://{guild_id}".to_string(),
                title: Some("Guild".to_string()),
                description: Some("A single guild, addressed by id.".to_string()),
                callback: Callback::Resource(Arc::new(GuildResource)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: None,
                resource: Some(ResourceExtras {
                    uri_template: "guild://{guild_id}".to_string(),
                    mime_type: "application/json".to_string(),
                    is_template: true,
                }),
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmcp_server::testing::{test_context, test_server_builder};

    #[tokio::test]
    async fn guild_get_returns_structured_content() {
        let (builder, platform) = test_server_builder("test");
        platform.insert_guild(chatmcp_core::Guild {
            id: "1".to_string(),
            name: "Test Guild".to_string(),
            owner_id: None,
        });
        GuildToolsPlugin.register(builder).unwrap();

        let (ctx, _access) = test_context(platform);
        let mut args = HashMap::new();
        args.insert("guild_id".to_string(), Value::String("1".to_string()));
        let result = GetGuild.call(&ctx, args).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.structured_content.unwrap()["name"], "Test Guild");
    }

    #[tokio::test]
    async fn guild_get_reports_missing_guild_as_tool_error() {
        let (_builder, platform) = test_server_builder("test");
        let (ctx, _access) = test_context(platform);
        let mut args = HashMap::new();
        args.insert("guild_id".to_string(), Value::String("missing".to_string()));
        let result = GetGuild.call(&ctx, args).await.unwrap();
        assert!(result.is_error);
    }
}
