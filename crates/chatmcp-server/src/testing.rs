//! In-process test harness: drives a [`crate::server::ServerCore`] directly,
//! without going through stdio or HTTP framing. Used by this crate's own
//! integration tests and by downstream plugin crates.

use crate::server::ServerBuilder;
use async_trait::async_trait;
use chatmcp_core::context::{ServerAccess, ServerHandle};
use chatmcp_core::{Channel, Context, Guild, Message, PlatformClient, Role, Transport, User};
use chatmcp_protocol::types::ReadResourceResult;
use chatmcp_protocol::McpResult;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An in-memory [`PlatformClient`] fixture. Tests seed it via `insert_*`
/// before building the server, then assert on what tool/resource callbacks
/// return.
#[derive(Default)]
pub struct MockPlatformClient {
    guilds: DashMap<String, Guild>,
    channels: DashMap<String, Channel>,
    roles: DashMap<(String, String), Role>,
    users: DashMap<String, User>,
    messages: DashMap<(String, String), Message>,
    sent: parking_lot::Mutex<Vec<(String, String)>>,
}

impl MockPlatformClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_guild(&self, guild: Guild) {
        self.guilds.insert(guild.id.clone(), guild);
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id.clone(), channel);
    }

    pub fn insert_role(&self, guild_id: impl Into<String>, role: Role) {
        self.roles.insert((guild_id.into(), role.id.clone()), role);
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Every `(channel_id, content)` pair passed to `send_message` so far.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn login(&self, _token: &str) -> McpResult<()> {
        Ok(())
    }

    async fn connect(&self) -> McpResult<()> {
        Ok(())
    }

    async fn wait_ready(&self) -> McpResult<()> {
        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
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
        Ok(self
            .roles
            .get(&(guild_id.to_string(), role_id.to_string()))
            .map(|r| r.value().clone()))
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
        self.sent.lock().push((channel_id.to_string(), content.to_string()));
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.to_string(),
            author_id: "test-bot".to_string(),
            content: content.to_string(),
        };
        self.messages
            .insert((channel_id.to_string(), message.id.clone()), message.clone());
        Ok(message)
    }

    async fn raw_object(&self, _kind: &str, _id: &str) -> McpResult<Option<Value>> {
        Ok(None)
    }
}

/// A [`ServerAccess`] that records what it was asked to do, for asserting on
/// log/progress emissions from tool callbacks under test.
#[derive(Default)]
pub struct RecordingServerAccess {
    logs: parking_lot::Mutex<Vec<(String, String)>>,
    progress: parking_lot::Mutex<Vec<(f64, Option<f64>)>>,
}

impl RecordingServerAccess {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn logs(&self) -> Vec<(String, String)> {
        self.logs.lock().clone()
    }

    pub fn progress_events(&self) -> Vec<(f64, Option<f64>)> {
        self.progress.lock().clone()
    }
}

#[async_trait]
impl ServerAccess for RecordingServerAccess {
    async fn read_resource(&self, _uri: &str) -> McpResult<ReadResourceResult> {
        Err(chatmcp_protocol::McpError::internal("test harness context cannot read resources; build through ServerCore instead"))
    }

    async fn log(&self, level: &str, message: &str) {
        self.logs.lock().push((level.to_string(), message.to_string()));
    }

    async fn report_progress(&self, progress: f64, total: Option<f64>, _message: Option<&str>) {
        self.progress.lock().push((progress, total));
    }

    async fn request(&self, _method: &str, _params: Value) -> McpResult<Value> {
        Err(chatmcp_protocol::McpError::internal("test harness context does not support server-initiated requests"))
    }
}

/// A bare `Context` for exercising a tool/resource/prompt callback in
/// isolation, without a running session or transport.
pub fn test_context(platform: Arc<dyn PlatformClient>) -> (Context, Arc<RecordingServerAccess>) {
    let access = RecordingServerAccess::new();
    let context = Context::new(
        uuid::Uuid::new_v4().to_string(),
        Some("test-session".to_string()),
        Transport::Http,
        None,
        CancellationToken::new(),
        ServerHandle::new(access.clone()),
        platform,
    );
    (context, access)
}

/// A `ServerBuilder` pre-wired with a fresh [`MockPlatformClient`], ready for
/// `.register_manifest(...)` calls and then `.build(platform)`.
pub fn test_server_builder(name: &str) -> (ServerBuilder, Arc<MockPlatformClient>) {
    (ServerBuilder::new(name, "0.0.0-test"), MockPlatformClient::new())
}
