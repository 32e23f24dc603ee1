//! Per-connection session runtime: the read loop, the in-flight request
//! table, the progress-token callback map, and teardown.
//!
//! A [`Session`] is transport-agnostic — it reads and writes
//! [`chatmcp_protocol::JsonRpcMessage`] values over plain channels. Both the
//! stdio and HTTP transports adapt their own I/O into these channels and
//! otherwise never touch the state machine directly.

use crate::dispatcher::Dispatcher;
use chatmcp_core::context::ServerHandle;
use chatmcp_core::{Context, PlatformClient, Transport};
use chatmcp_protocol::{
    JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    McpError, RequestId,
};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// One request that is currently being handled. Dropped the moment the
/// handler's response frame is written (whether via normal completion or
/// cancellation), which removes it from the in-flight table.
struct InFlightEntry {
    cancellation: CancellationToken,
}

/// A progress-token → callback registration, invoked when a
/// `notifications/progress` comes in (only meaningful for progress the
/// session itself originated as a server-to-client request; for inbound
/// client progress tied to a request, the handler polls `Context`).
pub type ProgressCallback = Box<dyn Fn(f64, Option<f64>, Option<String>) + Send + Sync>;

/// Runtime state for one MCP connection (one stdio process, or one logical
/// HTTP session).
pub struct Session {
    pub id: String,
    transport: Transport,
    outbound: mpsc::Sender<JsonRpcMessage>,
    in_flight: DashMap<RequestId, InFlightEntry>,
    pending_outbound_requests: DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>,
    progress_callbacks: DashMap<String, ProgressCallback>,
    next_outbound_id: std::sync::atomic::AtomicI64,
    platform: Arc<dyn PlatformClient>,
}

impl Session {
    pub fn new(id: impl Into<String>, transport: Transport, outbound: mpsc::Sender<JsonRpcMessage>, platform: Arc<dyn PlatformClient>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            transport,
            outbound,
            in_flight: DashMap::new(),
            pending_outbound_requests: DashMap::new(),
            progress_callbacks: DashMap::new(),
            next_outbound_id: std::sync::atomic::AtomicI64::new(1),
            platform,
        })
    }

    /// Drive the read loop until `inbound` closes or a read error arrives
    /// repeatedly; on return, every pending responder has been notified of
    /// connection closure.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<std::io::Result<String>>, dispatcher: Arc<Dispatcher>) {
        while let Some(frame) = inbound.recv().await {
            match frame {
                Err(err) => {
                    tracing::debug!(session = %self.id, error = %err, "inbound read error");
                    continue;
                }
                Ok(raw) => self.clone().handle_line(raw, dispatcher.clone()).await,
            }
        }
        self.teardown().await;
    }

    async fn handle_line(self: Arc<Self>, raw: String, dispatcher: Arc<Dispatcher>) {
        let message = match JsonRpcMessage::parse(&raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "rejecting unparseable frame");
                let id = recover_request_id(&raw);
                let response = JsonRpcResponse::error(id, McpError::invalid_params(err.to_string()).into_wire());
                if self.outbound.send(JsonRpcMessage::Response(response)).await.is_err() {
                    tracing::debug!(session = %self.id, "outbound channel closed while rejecting malformed frame");
                }
                return;
            }
        };
        match message {
            JsonRpcMessage::Request(request) => self.spawn_request(request, dispatcher),
            JsonRpcMessage::Notification(notification) => self.handle_notification(notification).await,
            JsonRpcMessage::Response(response) => self.handle_response(response),
        }
    }

    fn spawn_request(self: Arc<Self>, request: JsonRpcRequest, dispatcher: Arc<Dispatcher>) {
        let request_id = request.id.clone();
        if self.in_flight.contains_key(&request_id) {
            tracing::warn!(session = %self.id, %request_id, "duplicate in-flight request id");
            return;
        }
        let cancellation = CancellationToken::new();
        self.in_flight.insert(
            request_id.clone(),
            InFlightEntry {
                cancellation: cancellation.clone(),
            },
        );

        let session = self.clone();
        let bridge_dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let server = ServerHandle::new(Arc::new(crate::server::ContextBridge::new(session.clone(), bridge_dispatcher)));
            let context = Context::new(
                request_id.to_string(),
                session.http_session_id(),
                session.transport,
                request.params.as_ref().and_then(|p| p.get("_meta")).and_then(|m| m.get("progressToken")).cloned(),
                cancellation.clone(),
                server,
                session.platform.clone(),
            );

            let response = tokio::select! {
                result = dispatcher.dispatch(&context, &request) => {
                    match result {
                        Ok(result) => JsonRpcResponse::success(request_id.clone(), result),
                        Err(err) => JsonRpcResponse::error(Some(request_id.clone()), err.into_wire()),
                    }
                }
                _ = cancellation.cancelled() => {
                    JsonRpcResponse::error(Some(request_id.clone()), McpError::internal("request cancelled").into_wire())
                }
            };

            session.complete_request(&request_id, response).await;
        });
    }

    async fn complete_request(&self, request_id: &RequestId, response: JsonRpcResponse) {
        self.in_flight.remove(request_id);
        if self.outbound.send(JsonRpcMessage::Response(response)).await.is_err() {
            tracing::debug!(session = %self.id, "outbound channel closed while writing response");
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/cancelled" => {
                if let Some(request_id) = notification
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .and_then(value_to_request_id)
                {
                    if let Some(entry) = self.in_flight.get(&request_id) {
                        entry.cancellation.cancel();
                    }
                }
            }
            "notifications/progress" => {
                if let Some(params) = &notification.params {
                    if let Some(token) = params.get("progressToken").map(|t| t.to_string()) {
                        if let Some(callback) = self.progress_callbacks.get(&token) {
                            let progress = params.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
                            let total = params.get("total").and_then(Value::as_f64);
                            let message = params.get("message").and_then(Value::as_str).map(String::from);
                            callback(progress, total, message);
                        }
                    }
                }
            }
            other => {
                tracing::trace!(session = %self.id, method = other, "unhandled notification");
            }
        }
    }

    fn handle_response(&self, response: JsonRpcResponse) {
        let Some(id) = response.id.clone() else {
            tracing::warn!(session = %self.id, "response with no id, unable to route");
            return;
        };
        if let Some((_, sender)) = self.pending_outbound_requests.remove(&id) {
            let _ = sender.send(response);
        } else {
            tracing::warn!(session = %self.id, %id, "response for unknown outbound request");
        }
    }

    /// Close every in-flight responder with `ConnectionClosed` and clear the
    /// table. Idempotent.
    async fn teardown(&self) {
        let pending: Vec<_> = self.in_flight.iter().map(|entry| entry.key().clone()).collect();
        for request_id in pending {
            if let Some((_, entry)) = self.in_flight.remove(&request_id) {
                entry.cancellation.cancel();
            }
            let _ = self
                .outbound
                .send(JsonRpcMessage::Response(JsonRpcResponse::error(
                    Some(request_id),
                    JsonRpcErrorObject {
                        code: chatmcp_protocol::ErrorKind::ConnectionClosed.code(),
                        message: "connection closed".to_string(),
                        data: None,
                    },
                )))
                .await;
        }
        // Dropping these senders fails any in-flight `request()` calls with
        // a closed oneshot receiver, which `request()` maps to `ConnectionClosed`.
        self.pending_outbound_requests.clear();
    }

    /// Send a server-initiated request (elicitation, sampling) and await its
    /// response. Fails if the outbound channel is gone.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = RequestId::Number(self.next_outbound_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending_outbound_requests.insert(id.clone(), tx);
        let request = JsonRpcRequest::new(method, Some(params), id.clone());
        self.outbound
            .send(JsonRpcMessage::Request(request))
            .await
            .map_err(|_| McpError::connection_closed())?;
        let response = rx.await.map_err(|_| McpError::connection_closed())?;
        match response.payload {
            chatmcp_protocol::JsonRpcResponsePayload::Result { result } => Ok(result),
            chatmcp_protocol::JsonRpcResponsePayload::Error { error } => {
                Err(McpError::new(chatmcp_protocol::ErrorKind::Internal, error.message))
            }
        }
    }

    pub async fn notify(&self, method: &str, params: Value) {
        let notification = JsonRpcNotification::new(method, Some(params));
        let _ = self.outbound.send(JsonRpcMessage::Notification(notification)).await;
    }

    fn http_session_id(&self) -> Option<String> {
        match self.transport {
            Transport::Http => Some(self.id.clone()),
            Transport::Stdio => None,
        }
    }
}

fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(n) = value.as_i64() {
        return Some(RequestId::Number(n));
    }
    value.as_str().map(|s| RequestId::String(s.to_string()))
}

/// Best-effort recovery of `id` from a frame that failed to parse as a
/// well-formed request (e.g. an `id` of the wrong JSON type). Falls back to
/// `None` if the frame isn't even valid JSON, or carries no `id` at all.
fn recover_request_id(raw: &str) -> Option<RequestId> {
    let value: Value = serde_json::from_str(raw).ok()?;
    value.get("id").and_then(value_to_request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_server_builder;
    use chatmcp_core::Transport;

    async fn test_session() -> (Arc<Session>, Arc<Dispatcher>, mpsc::Receiver<JsonRpcMessage>) {
        let (builder, platform) = test_server_builder("test");
        let server = builder.build(platform).await.unwrap();
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        let session = Session::new("s1", Transport::Stdio, outbound_tx, server.platform.clone());
        (session, server.dispatcher.clone(), outbound_rx)
    }

    #[tokio::test]
    async fn malformed_id_writes_exactly_one_invalid_params_response() {
        let (session, dispatcher, mut outbound) = test_session().await;
        session
            .clone()
            .handle_line(r#"{"jsonrpc":"2.0","method":"ping","id":{}}"#.to_string(), dispatcher)
            .await;

        let frame = outbound.try_recv().expect("expected one response frame");
        match frame {
            JsonRpcMessage::Response(response) => {
                assert!(response.is_error());
                match response.payload {
                    chatmcp_protocol::JsonRpcResponsePayload::Error { error } => {
                        assert_eq!(error.code, chatmcp_protocol::ErrorKind::InvalidParams.code());
                    }
                    _ => panic!("expected error payload"),
                }
            }
            _ => panic!("expected a response frame"),
        }
        assert!(outbound.try_recv().is_err(), "exactly one frame should be written");
    }

    #[tokio::test]
    async fn garbage_input_still_rejects_with_no_id() {
        let (session, dispatcher, mut outbound) = test_session().await;
        session.clone().handle_line("not json at all".to_string(), dispatcher).await;

        let frame = outbound.try_recv().expect("expected one response frame");
        match frame {
            JsonRpcMessage::Response(response) => {
                assert!(response.id.is_none());
                assert!(response.is_error());
            }
            _ => panic!("expected a response frame"),
        }
    }

    #[tokio::test]
    async fn well_formed_request_still_dispatches_normally() {
        let (session, dispatcher, mut outbound) = test_session().await;
        session
            .clone()
            .handle_line(r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#.to_string(), dispatcher)
            .await;

        let frame = tokio::time::timeout(std::time::Duration::from_secs(1), outbound.recv())
            .await
            .expect("response within timeout")
            .expect("channel open");
        match frame {
            JsonRpcMessage::Response(response) => assert!(!response.is_error()),
            _ => panic!("expected a response frame"),
        }
    }
}
