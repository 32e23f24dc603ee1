//! The per-request "god object" handed to every callback.
//!
//! Built fresh for each dispatched request and dropped when the handler
//! returns. Holds the request id, a handle back into the owning session (for
//! progress/logging and server-initiated requests) and the lifespan state
//! (platform client + an opaque handle back to the server), but never the
//! manifest registry or middleware chain directly — callbacks reach those
//! only through [`ServerAccess`], avoiding a manifest/context/server
//! reference cycle.

use crate::platform::PlatformClient;
use async_trait::async_trait;
use chatmcp_protocol::types::ReadResourceResult;
use chatmcp_protocol::{McpError, McpResult};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

/// Everything a [`Context`] can ask the owning session to do on its behalf:
/// read another resource, emit a log message, report progress, or make a
/// server-initiated request (elicitation, sampling). Implemented by the
/// session runtime in `chatmcp-server`; `chatmcp-core` only sees the trait,
/// which is what breaks the manifest/registry/session reference cycle.
#[async_trait]
pub trait ServerAccess: Send + Sync {
    async fn read_resource(&self, uri: &str) -> McpResult<ReadResourceResult>;
    async fn log(&self, level: &str, message: &str);
    async fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>);
    async fn request(&self, method: &str, params: Value) -> McpResult<Value>;
}

/// Opaque handle to the server, cheap to clone, passed into every `Context`.
#[derive(Clone)]
pub struct ServerHandle(Arc<dyn ServerAccess>);

impl ServerHandle {
    pub fn new(access: Arc<dyn ServerAccess>) -> Self {
        Self(access)
    }
}

impl std::ops::Deref for ServerHandle {
    type Target = dyn ServerAccess;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Per-request context passed to every tool/resource/prompt callback and
/// check.
#[derive(Clone)]
pub struct Context {
    pub request_id: String,
    pub session_id: Option<String>,
    pub transport: Transport,
    pub progress_token: Option<Value>,
    cancellation: CancellationToken,
    server: ServerHandle,
    platform: Arc<dyn PlatformClient>,
}

impl Context {
    pub fn new(
        request_id: impl Into<String>,
        session_id: Option<String>,
        transport: Transport,
        progress_token: Option<Value>,
        cancellation: CancellationToken,
        server: ServerHandle,
        platform: Arc<dyn PlatformClient>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            session_id,
            transport,
            progress_token,
            cancellation,
            server,
            platform,
        }
    }

    pub fn platform(&self) -> &dyn PlatformClient {
        &*self.platform
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once cooperative cancellation has been requested for this
    /// request. Callbacks doing long-running work should `select!` on this.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    pub async fn read_resource(&self, uri: &str) -> McpResult<ReadResourceResult> {
        self.server.read_resource(uri).await
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.server.log("info", &message.into()).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.server.log("warning", &message.into()).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.server.log("error", &message.into()).await;
    }

    /// Report progress on the current request. A no-op if the client never
    /// supplied a progress token on the original call.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        if self.progress_token.is_some() {
            self.server.report_progress(progress, total, message).await;
        }
    }

    /// Make a server-initiated request of the client (elicitation, sampling).
    /// Fails with `ErrorKind::Internal` on stdio without a bidirectional
    /// session or on any transport the client didn't negotiate it for.
    pub async fn request(&self, method: &str, params: Value) -> McpResult<Value> {
        self.server.request(method, params).await.map_err(|e| {
            McpError::internal(format!("server-initiated request '{method}' failed: {e}"))
        })
    }
}
