//! A minimal in-memory [`PlatformClient`], standing in for a real chat
//! platform gateway connection. A production binding (e.g. a Discord
//! gateway client) is out of scope here — this crate's job is the MCP
//! surface, not a platform SDK — so this client seeds a small fixed roster
//! at startup and serves it back, which is enough to exercise every tool,
//! resource and prompt this binary registers.

use async_trait::async_trait;
use chatmcp_core::{Channel, Guild, Message, PlatformClient, Role, User};
use chatmcp_protocol::McpResult;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

pub struct DemoPlatformClient {
    guilds: DashMap<String, Guild>,
    channels: DashMap<String, Channel>,
    roles: DashMap<(String, String), Role>,
    users: DashMap<String, User>,
    messages: DashMap<(String, String), Message>,
    self_user: User,
}

impl DemoPlatformClient {
    /// Seed a small fixed roster: one guild, two channels, the bot's own
    /// user, and one additional member.
    pub fn seeded() -> Arc<Self> {
        let guilds = DashMap::new();
        guilds.insert(
            "1".to_string(),
            Guild {
                id: "1".to_string(),
                name: "Demo Guild".to_string(),
                owner_id: Some("100".to_string()),
            },
        );

        let channels = DashMap::new();
        channels.insert(
            "10".to_string(),
            Channel {
                id: "10".to_string(),
                guild_id: Some("1".to_string()),
                name: Some("general".to_string()),
                kind: "text".to_string(),
            },
        );
        channels.insert(
            "11".to_string(),
            Channel {
                id: "11".to_string(),
                guild_id: Some("1".to_string()),
                name: Some("moderation".to_string()),
                kind: "text".to_string(),
            },
        );

        let roles = DashMap::new();
        roles.insert(
            ("1".to_string(), "20".to_string()),
            Role {
                id: "20".to_string(),
                guild_id: "1".to_string(),
                name: "moderator".to_string(),
                permissions: "0".to_string(),
            },
        );

        let self_user = User {
            id: "99".to_string(),
            username: "chatmcp-bot".to_string(),
            bot: true,
        };
        let users = DashMap::new();
        users.insert(self_user.id.clone(), self_user.clone());
        users.insert(
            "100".to_string(),
            User {
                id: "100".to_string(),
                username: "ada".to_string(),
                bot: false,
            },
        );

        Arc::new(Self {
            guilds,
            channels,
            roles,
            users,
            messages: DashMap::new(),
            self_user,
        })
    }
}

#[async_trait]
impl PlatformClient for DemoPlatformClient {
    async fn login(&self, _token: &str) -> McpResult<()> {
        tracing::info!("demo platform client: login accepted");
        Ok(())
    }

    async fn connect(&self) -> McpResult<()> {
        tracing::info!("demo platform client: connected");
        Ok(())
    }

    async fn wait_ready(&self) -> McpResult<()> {
        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        tracing::info!("demo platform client: closed");
        Ok(())
    }

    async fn guild(&self, guild_id: &str) -> McpResult<Option<Guild>> {
        Ok(self.guilds.get(guild_id).map(|g| g.value().clone()))
    }

    async fn guilds(&self) -> McpResult<Vec<Guild>> {
        Ok(self.guilds.iter().map(|g| g.value().clone()).collect())
    }

    async fn channel(&self, channel_id: &str) -> McpResult<Option<Channel>> {
        Ok(self.channels.get(channel_id).map(|c| c.value().clone()))
    }

    async fn channels(&self, guild_id: &str) -> McpResult<Vec<Channel>> {
        Ok(self
            .channels
            .iter()
            .filter(|c| c.value().guild_id.as_deref() == Some(guild_id))
            .map(|c| c.value().clone())
            .collect())
    }

    async fn role(&self, guild_id: &str, role_id: &str) -> McpResult<Option<Role>> {
        Ok(self.roles.get(&(guild_id.to_string(), role_id.to_string())).map(|r| r.value().clone()))
    }

    async fn roles(&self, guild_id: &str) -> McpResult<Vec<Role>> {
        Ok(self
            .roles
            .iter()
            .filter(|e| e.key().0 == guild_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn user(&self, user_id: &str) -> McpResult<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn message(&self, channel_id: &str, message_id: &str) -> McpResult<Option<Message>> {
        Ok(self
            .messages
            .get(&(channel_id.to_string(), message_id.to_string()))
            .map(|m| m.value().clone()))
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> McpResult<Message> {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.to_string(),
            author_id: self.self_user.id.clone(),
            content: content.to_string(),
        };
        self.messages.insert((channel_id.to_string(), message.id.clone()), message.clone());
        Ok(message)
    }

    async fn raw_object(&self, kind: &str, _id: &str) -> McpResult<Option<Value>> {
        match kind {
            "self_user" => Ok(Some(serde_json::to_value(&self.self_user)?)),
            "users" => {
                let all: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
                Ok(Some(serde_json::to_value(&all)?))
            }
            "latency" => Ok(Some(Value::from(12.5))),
            _ => Ok(None),
        }
    }
}
