//! The capability surface the engine needs from the chat platform.
//!
//! The platform's actual object model (guilds, channels, users, roles,
//! messages, and the hundreds of fields attached to each) is explicitly out
//! of scope for this engine: what matters is that the registry can index and
//! validate against whatever shape a plugin declares. The types below are
//! the minimal, widely-useful fields plugins tend to need; a plugin is free
//! to ignore them and work with [`serde_json::Value`] directly via
//! [`PlatformClient::raw_object`].

use async_trait::async_trait;
use chatmcp_protocol::McpResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub guild_id: Option<String>,
    pub name: Option<String>,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
}

/// Everything the engine needs from the underlying chat-platform client.
///
/// A concrete implementation owns the actual gateway/REST connection; the
/// engine only ever sees this trait, and only ever calls it from within a
/// [`crate::context::Context`].
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Authenticate with the platform. Must complete before `connect`.
    async fn login(&self, token: &str) -> McpResult<()>;

    /// Open the long-lived gateway connection. Idempotent once connected.
    async fn connect(&self) -> McpResult<()>;

    /// Block until the gateway reports the session as ready (guild cache
    /// populated, heartbeats flowing).
    async fn wait_ready(&self) -> McpResult<()>;

    /// Tear down the gateway connection. Safe to call more than once.
    async fn close(&self) -> McpResult<()>;

    async fn guild(&self, guild_id: &str) -> McpResult<Option<Guild>>;
    async fn guilds(&self) -> McpResult<Vec<Guild>>;
    async fn channel(&self, channel_id: &str) -> McpResult<Option<Channel>>;
    async fn channels(&self, guild_id: &str) -> McpResult<Vec<Channel>>;
    async fn role(&self, guild_id: &str, role_id: &str) -> McpResult<Option<Role>>;
    async fn roles(&self, guild_id: &str) -> McpResult<Vec<Role>>;
    async fn user(&self, user_id: &str) -> McpResult<Option<User>>;
    async fn message(&self, channel_id: &str, message_id: &str) -> McpResult<Option<Message>>;
    async fn send_message(&self, channel_id: &str, content: &str) -> McpResult<Message>;

    /// Escape hatch for plugins that need a field this trait doesn't name.
    async fn raw_object(&self, kind: &str, id: &str) -> McpResult<Option<Value>>;
}
