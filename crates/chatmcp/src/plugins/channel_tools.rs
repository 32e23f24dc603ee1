//! Channel lookup and messaging tools, reduced from the original bot's
//! channel plugin (`get_channel`, `edit_channel`, `delete_channel`,
//! `edit_channel_permissions`) to the read/send surface this engine's
//! platform trait actually exposes.

use crate::Plugin;
use async_trait::async_trait;
use chatmcp_core::manifest::{Callback, ToolExtras};
use chatmcp_core::schema::{ArgSchema, ParamSchema, ParamType};
use chatmcp_core::{Context, Kind, Manifest, ToolCallback};
use chatmcp_protocol::types::{CallToolResult, ContentBlock};
use chatmcp_protocol::McpResult;
use chatmcp_server::error::ServerError;
use chatmcp_server::ServerBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

struct GetChannel;

#[async_trait]
impl ToolCallback for GetChannel {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let channel_id = arguments["channel_id"].as_str().unwrap_or_default();
        match ctx.platform().channel(channel_id).await? {
            Some(channel) => {
                let value = serde_json::to_value(&channel)?;
                Ok(CallToolResult::structured(
                    vec![ContentBlock::text(format!(
                        "{} ({})",
                        channel.name.as_deref().unwrap_or("unnamed"),
                        channel.id
                    ))],
                    value,
                ))
            }
            None => Ok(CallToolResult::error(format!("no channel with id '{channel_id}'"))),
        }
    }
}

struct ListChannels;

#[async_trait]
impl ToolCallback for ListChannels {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let guild_id = arguments["guild_id"].as_str().unwrap_or_default();
        let channels = ctx.platform().channels(guild_id).await?;
        let value = serde_json::to_value(&channels)?;
        Ok(CallToolResult::structured(
            vec![ContentBlock::text(format!("{} channel(s)", channels.len()))],
            value,
        ))
    }
}

struct SendMessage;

#[async_trait]
impl ToolCallback for SendMessage {
    async fn call(&self, ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let channel_id = arguments["channel_id"].as_str().unwrap_or_default();
        let content = arguments["content"].as_str().unwrap_or_default();
        let message = ctx.platform().send_message(channel_id, content).await?;
        let value = serde_json::to_value(&message)?;
        Ok(CallToolResult::structured(vec![ContentBlock::text(format!("sent message {}", message.id))], value))
    }
}

pub struct ChannelToolsPlugin;

#[async_trait]
impl Plugin for ChannelToolsPlugin {
    fn name(&self) -> &str {
        "channel_tools"
    }

    fn register(&self, builder: ServerBuilder) -> Result<ServerBuilder, ServerError> {
        builder
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "channel_get".to_string(),
                title: Some("Get Channel".to_string()),
                description: Some("Look up a single channel by id.".to_string()),
                callback: Callback::Tool(Arc::new(GetChannel)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: Some(ArgSchema::new(vec![ParamSchema::new("channel_id", ParamType::String)
                    .describe("The channel id to look up")])),
            })?
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "channel_list".to_string(),
                title: Some("List Channels".to_string()),
                description: Some("List every channel in a guild.".to_string()),
                callback: Callback::Tool(Arc::new(ListChannels)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras::default()),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: Some(ArgSchema::new(vec![ParamSchema::new("guild_id", ParamType::String)
                    .describe("The guild id whose channels to list")])),
            })?
            .register_manifest(Manifest {
                kind: Kind::Tool,
                key: "channel_send_message".to_string(),
                title: Some("Send Message".to_string()),
                description: Some("Post a message to a channel.".to_string()),
                callback: Callback::Tool(Arc::new(SendMessage)),
                enabled: true,
                checks: Vec::new(),
                cooldown: None,
                tool: Some(ToolExtras {
                    annotations: chatmcp_protocol::types::ToolAnnotations {
                        destructive_hint: Some(false),
                        ..Default::default()
                    },
                    structured_output: true,
                }),
                resource: None,
                prompt: None,
                autocomplete_args: Vec::new(),
                schema: Some(ArgSchema::new(vec![
                    ParamSchema::new("channel_id", ParamType::String).describe("The destination channel id"),
                    ParamSchema::new("content", ParamType::String).describe("The message body"),
                ])),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmcp_server::testing::{test_context, test_server_builder};

    #[tokio::test]
    async fn send_message_reaches_the_platform_client() {
        let (_builder, platform) = test_server_builder("test");
        platform.insert_channel(chatmcp_core::Channel {
            id: "c1".to_string(),
            guild_id: Some("g1".to_string()),
            name: Some("general".to_string()),
            kind: "text".to_string(),
        });
        let (ctx, _access) = test_context(platform.clone());

        let mut args = HashMap::new();
        args.insert("channel_id".to_string(), Value::String("c1".to_string()));
        args.insert("content".to_string(), Value::String("hello".to_string()));
        let result = SendMessage.call(&ctx, args).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(platform.sent_messages(), vec![("c1".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn list_channels_filters_by_guild() {
        let (_builder, platform) = test_server_builder("test");
        platform.insert_channel(chatmcp_core::Channel {
            id: "c1".to_string(),
            guild_id: Some("g1".to_string()),
            name: Some("general".to_string()),
            kind: "text".to_string(),
        });
        platform.insert_channel(chatmcp_core::Channel {
            id: "c2".to_string(),
            guild_id: Some("g2".to_string()),
            name: Some("off-topic".to_string()),
            kind: "text".to_string(),
        });
        let (ctx, _access) = test_context(platform);
        let mut args = HashMap::new();
        args.insert("guild_id".to_string(), Value::String("g1".to_string()));
        let result = ListChannels.call(&ctx, args).await.unwrap();
        let channels = result.structured_content.unwrap();
        assert_eq!(channels.as_array().unwrap().len(), 1);
    }
}
