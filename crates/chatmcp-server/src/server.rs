//! Server core: owns the managers, installs default middleware, registers
//! plugins, runs lifespan (platform-client login/teardown), and exposes the
//! transport-specific entry points.

use crate::autocomplete::{AutocompleteCallback, AutocompleteHandler};
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::event_store::{EventStore, EventStoreAdapter, InMemoryEventStore};
use crate::managers::Managers;
use crate::middleware::{ChecksMiddleware, RateLimitMiddleware};
use crate::session::Session;
use async_trait::async_trait;
use chatmcp_core::context::ServerAccess;
use chatmcp_core::{Manifest, PlatformClient, Transport};
use chatmcp_protocol::types::ReadResourceResult;
use chatmcp_protocol::McpResult;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Bridges `chatmcp_core::ServerAccess` (what a `Context` is allowed to
/// call) to the concrete session + dispatcher pair, without handing
/// callbacks a live reference to either.
pub struct ContextBridge {
    session: Arc<Session>,
    dispatcher: Arc<Dispatcher>,
}

impl ContextBridge {
    pub fn new(session: Arc<Session>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { session, dispatcher }
    }
}

#[async_trait]
impl ServerAccess for ContextBridge {
    async fn read_resource(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let ctx = self.make_anonymous_context();
        let value = self
            .dispatcher
            .read_resource_for_context(&ctx, uri)
            .await?;
        serde_json::from_value(value).map_err(chatmcp_protocol::McpError::from)
    }

    async fn log(&self, level: &str, message: &str) {
        self.session
            .notify(
                "notifications/message",
                serde_json::json!({ "level": level, "data": message }),
            )
            .await;
    }

    async fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        self.session
            .notify(
                "notifications/progress",
                serde_json::json!({ "progress": progress, "total": total, "message": message }),
            )
            .await;
    }

    async fn request(&self, method: &str, params: Value) -> McpResult<Value> {
        self.session.request(method, params).await
    }
}

impl ContextBridge {
    /// `read_resource` calls back into the dispatcher outside of any live
    /// request, so it needs a throwaway context of its own rather than the
    /// caller's (which would otherwise alias `Context` across two in-flight
    /// requests).
    fn make_anonymous_context(&self) -> chatmcp_core::Context {
        chatmcp_core::Context::new(
            uuid::Uuid::new_v4().to_string(),
            None,
            Transport::Stdio,
            None,
            CancellationToken::new(),
            chatmcp_core::context::ServerHandle::new(Arc::new(NullAccess)),
            Arc::new(NullPlatformClient),
        )
    }
}

/// A `ServerAccess` that refuses every server-initiated call. Used only as
/// the lifespan placeholder inside `ContextBridge::make_anonymous_context`,
/// which must not recurse into another live session.
struct NullAccess;

#[async_trait]
impl ServerAccess for NullAccess {
    async fn read_resource(&self, _uri: &str) -> McpResult<ReadResourceResult> {
        Err(chatmcp_protocol::McpError::internal("nested resource reads are not supported"))
    }

    async fn log(&self, _level: &str, _message: &str) {}

    async fn report_progress(&self, _progress: f64, _total: Option<f64>, _message: Option<&str>) {}

    async fn request(&self, _method: &str, _params: Value) -> McpResult<Value> {
        Err(chatmcp_protocol::McpError::internal("server-initiated requests are not supported here"))
    }
}

struct NullPlatformClient;

#[async_trait]
impl PlatformClient for NullPlatformClient {
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
    async fn guild(&self, _guild_id: &str) -> McpResult<Option<chatmcp_core::Guild>> {
        Ok(None)
    }
    async fn guilds(&self) -> McpResult<Vec<chatmcp_core::Guild>> {
        Ok(Vec::new())
    }
    async fn channel(&self, _channel_id: &str) -> McpResult<Option<chatmcp_core::Channel>> {
        Ok(None)
    }
    async fn channels(&self, _guild_id: &str) -> McpResult<Vec<chatmcp_core::Channel>> {
        Ok(Vec::new())
    }
    async fn role(&self, _guild_id: &str, _role_id: &str) -> McpResult<Option<chatmcp_core::Role>> {
        Ok(None)
    }
    async fn roles(&self, _guild_id: &str) -> McpResult<Vec<chatmcp_core::Role>> {
        Ok(Vec::new())
    }
    async fn user(&self, _user_id: &str) -> McpResult<Option<chatmcp_core::User>> {
        Ok(None)
    }
    async fn message(&self, _channel_id: &str, _message_id: &str) -> McpResult<Option<chatmcp_core::Message>> {
        Ok(None)
    }
    async fn send_message(&self, _channel_id: &str, _content: &str) -> McpResult<chatmcp_core::Message> {
        Err(chatmcp_protocol::McpError::internal("no platform client attached"))
    }
    async fn raw_object(&self, _kind: &str, _id: &str) -> McpResult<Option<Value>> {
        Ok(None)
    }
}

/// Builds a [`ServerCore`]: registers manifests, wires middleware, and picks
/// the event store adapter.
pub struct ServerBuilder {
    managers: Managers,
    rate_limit: Arc<RateLimitMiddleware>,
    checks: Arc<ChecksMiddleware>,
    autocomplete: AutocompleteHandler,
    server_name: String,
    server_version: String,
    instructions: Option<String>,
    event_adapter: Arc<dyn EventStoreAdapter>,
}

impl ServerBuilder {
    pub fn new(server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            managers: Managers::new(),
            rate_limit: Arc::new(RateLimitMiddleware::new()),
            checks: Arc::new(ChecksMiddleware::new()),
            autocomplete: AutocompleteHandler::new(),
            server_name: server_name.into(),
            server_version: server_version.into(),
            instructions: None,
            event_adapter: Arc::new(InMemoryEventStore::new()),
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn event_adapter(mut self, adapter: Arc<dyn EventStoreAdapter>) -> Self {
        self.event_adapter = adapter;
        self
    }

    /// Register one manifest into the matching registry, wiring its
    /// cooldown and checks into the shared middleware.
    pub fn register_manifest(self, manifest: Manifest) -> Result<Self, ServerError> {
        let kind = manifest.kind;
        let key = manifest.key.clone();

        if let Some(cooldown) = manifest.cooldown {
            self.rate_limit
                .register(kind, key.clone(), Arc::new(crate::rate_limit::CooldownManager::new(cooldown)));
        }
        if !manifest.checks.is_empty() {
            self.checks.register(kind, key.clone(), manifest.checks.clone());
        }

        let registry = match kind {
            chatmcp_core::Kind::Tool => &self.managers.tools,
            chatmcp_core::Kind::Resource => &self.managers.resources,
            chatmcp_core::Kind::Prompt => &self.managers.prompts,
        };
        registry.add(manifest).map_err(ServerError::from)?;
        Ok(self)
    }

    /// Attach an autocomplete callback for one argument of a prompt or
    /// resource template already (or about to be) registered under `kind`.
    pub fn register_autocomplete(
        self,
        kind: chatmcp_core::Kind,
        manifest_key: impl Into<String>,
        arg_name: impl Into<String>,
        callback: Arc<dyn AutocompleteCallback>,
    ) -> Self {
        self.autocomplete.register(kind, manifest_key, arg_name, callback);
        self
    }

    pub async fn build(self, platform: Arc<dyn PlatformClient>) -> Result<Arc<ServerCore>, ServerError> {
        let event_store = Arc::new(EventStore::new(self.event_adapter));
        event_store.init().await.map_err(ServerError::from)?;

        let pipeline = crate::middleware::default_pipeline(self.rate_limit, self.checks);

        let dispatcher = Arc::new(Dispatcher {
            managers: self.managers,
            pipeline,
            autocomplete: self.autocomplete,
            server_name: self.server_name,
            server_version: self.server_version,
            instructions: self.instructions,
        });

        Ok(Arc::new(ServerCore {
            dispatcher,
            event_store,
            platform,
        }))
    }
}

/// The running server: dispatch table, event store, and a handle to the
/// platform client's lifespan.
pub struct ServerCore {
    pub dispatcher: Arc<Dispatcher>,
    pub event_store: Arc<EventStore>,
    pub platform: Arc<dyn PlatformClient>,
}

impl ServerCore {
    /// Bring the platform client up: login, connect, wait for readiness.
    /// Must succeed before the first MCP request is accepted.
    pub async fn start_lifespan(&self, token: &str) -> McpResult<()> {
        self.platform.login(token).await?;
        self.platform.connect().await?;
        self.platform.wait_ready().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> McpResult<()> {
        self.platform.close().await
    }

    /// Run one stdio session end to end: one process, one session, exits
    /// when `inbound` closes.
    pub async fn run_stdio(self: &Arc<Self>, inbound: mpsc::Receiver<std::io::Result<String>>, outbound: mpsc::Sender<chatmcp_protocol::JsonRpcMessage>) {
        let session = Session::new("stdio", Transport::Stdio, outbound, self.platform.clone());
        session.run(inbound, self.dispatcher.clone()).await;
    }

    /// Create a new logical HTTP session bound to `session_id`, wired to the
    /// given channel pair, and run its read loop. Returns once the session's
    /// inbound channel closes.
    pub async fn run_http_session(
        self: &Arc<Self>,
        session_id: impl Into<String>,
        inbound: mpsc::Receiver<std::io::Result<String>>,
        outbound: mpsc::Sender<chatmcp_protocol::JsonRpcMessage>,
    ) {
        let session = Session::new(session_id, Transport::Http, outbound, self.platform.clone());
        session.run(inbound, self.dispatcher.clone()).await;
    }
}
