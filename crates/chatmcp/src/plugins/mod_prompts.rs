//! A moderation-flavored prompt, following the argument/required-field shape
//! the original bot's prompt managers validate against.

use crate::Plugin;
use async_trait::async_trait;
use chatmcp_core::manifest::{Callback, PromptExtras};
use chatmcp_core::{Context, Kind, Manifest, PromptCallback};
use chatmcp_protocol::types::{ContentBlock, GetPromptResult, PromptArgument, PromptMessage, PromptRole};
use chatmcp_protocol::{McpError, McpResult};
use chatmcp_server::error::ServerError;
use chatmcp_server::ServerBuilder;
use std::collections::HashMap;
use std::sync::Arc;

struct ModerationSummary;

#[async_trait]
impl PromptCallback for ModerationSummary {
    async fn render(&self, ctx: &Context, arguments: HashMap<String, String>) -> McpResult<GetPromptResult> {
        let guild_id = arguments
            .get("guild_id")
            .ok_or_else(|| McpError::invalid_params("missing required argument 'guild_id'"))?;
        let guild = ctx
            .platform()
            .guild(guild_id)
            .await?
            .ok_or_else(|| McpError::prompt_render_error(format!("no guild with id '{guild_id}'")))?;
        let reason = arguments.get("reason").map(String::as_str).unwrap_or("a routine review");

        let text = format!(
            "Draft a moderation summary for the guild \"{}\" (id {}). Context: {}. \
             List any notable recent incidents, then recommend next steps.",
            guild.name, guild.id, reason
        );
        Ok(GetPromptResult {
            description: Some("Moderation summary request".to_string()),
            messages: vec![PromptMessage {
                role: PromptRole::User,
                content: ContentBlock::text(text),
            }],
        })
    }
}

pub struct ModerationPromptsPlugin;

#[async_trait]
impl Plugin for ModerationPromptsPlugin {
    fn name(&self) -> &str {
        "moderation_prompts"
    }

    fn register(&self, builder: ServerBuilder) -> Result<ServerBuilder, ServerError> {
        builder.register_manifest(Manifest {
            kind: Kind::Prompt,
            key: "moderation_summary".to_string(),
            title: Some("Moderation Summary".to_string()),
            description: Some("Ask the assistant to draft a moderation summary for a guild.".to_string()),
            callback: Callback::Prompt(Arc::new(ModerationSummary)),
            enabled: true,
            checks: Vec::new(),
            cooldown: None,
            tool: None,
            resource: None,
            prompt: Some(PromptExtras {
                arguments: vec![
                    PromptArgument {
                        name: "guild_id".to_string(),
                        description: Some("The guild to summarize".to_string()),
                        required: true,
                    },
                    PromptArgument {
                        name: "reason".to_string(),
                        description: Some("Why the summary is being requested".to_string()),
                        required: false,
                    },
                ],
            }),
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
    async fn renders_a_summary_prompt_for_a_known_guild() {
        let (_builder, platform) = test_server_builder("test");
        platform.insert_guild(chatmcp_core::Guild {
            id: "1".to_string(),
            name: "Test Guild".to_string(),
            owner_id: None,
        });
        let (ctx, _access) = test_context(platform);
        let mut args = HashMap::new();
        args.insert("guild_id".to_string(), "1".to_string());
        let result = ModerationSummary.render(&ctx, args).await.unwrap();
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn missing_guild_id_is_an_invalid_params_error() {
        let (_builder, platform) = test_server_builder("test");
        let (ctx, _access) = test_context(platform);
        let err = ModerationSummary.render(&ctx, HashMap::new()).await.unwrap_err();
        assert_eq!(err.kind, chatmcp_protocol::ErrorKind::InvalidParams);
    }
}
