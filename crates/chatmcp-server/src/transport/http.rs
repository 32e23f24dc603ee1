//! Streamable HTTP transport: a session manager demultiplexes many logical
//! sessions over one HTTP listener. Each session gets its own inbound
//! channel into the session runtime and its own outbound fan-out, appended
//! to the event store as it goes so a reconnecting client can replay.

use crate::event_store::EventStore;
use crate::server::ServerCore;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chatmcp_protocol::JsonRpcMessage;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SESSION_HEADER: &str = "mcp-session-id";
const LAST_EVENT_HEADER: &str = "last-event-id";

struct SessionHandle {
    inbound: mpsc::Sender<std::io::Result<String>>,
    broadcast: broadcast::Sender<String>,
}

pub struct HttpState {
    server: Arc<ServerCore>,
    event_store: Arc<EventStore>,
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl HttpState {
    pub fn new(server: Arc<ServerCore>) -> Arc<Self> {
        let event_store = server.event_store.clone();
        Arc::new(Self {
            server,
            event_store,
            sessions: DashMap::new(),
        })
    }

    fn get_or_create_session(self: &Arc<Self>, session_id: &str) -> Arc<SessionHandle> {
        if let Some(existing) = self.sessions.get(session_id) {
            return existing.value().clone();
        }
        let (inbound_tx, inbound_rx) = mpsc::channel::<std::io::Result<String>>(64);
        let (outbound_tx, outbound_rx) = mpsc::channel::<JsonRpcMessage>(64);
        let (broadcast_tx, _) = broadcast::channel::<String>(256);

        let handle = Arc::new(SessionHandle {
            inbound: inbound_tx,
            broadcast: broadcast_tx.clone(),
        });
        self.sessions.insert(session_id.to_string(), handle.clone());

        let server = self.server.clone();
        let session_id_owned = session_id.to_string();
        tokio::spawn(async move {
            server.run_http_session(session_id_owned, inbound_rx, outbound_tx).await;
        });

        let event_store = self.event_store.clone();
        let stream_id = session_id.to_string();
        tokio::spawn(async move {
            let mut outbound_rx = outbound_rx;
            while let Some(message) = outbound_rx.recv().await {
                let Ok(line) = message.to_line() else { continue };
                if event_store.store_event(&stream_id, &line).await.is_err() {
                    tracing::warn!(stream_id, "failed to persist outbound event");
                }
                let _ = broadcast_tx.send(line);
            }
        });

        handle
    }
}

#[derive(Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// POST one JSON-RPC frame into a session. Creates the session on first
/// contact if no `mcp-session-id` header is present.
async fn post_message(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let handle = state.get_or_create_session(&session_id);
    let Ok(line) = serde_json::to_string(&body) else {
        return (StatusCode::BAD_REQUEST, "malformed frame").into_response();
    };
    if handle.inbound.send(Ok(line)).await.is_err() {
        return (StatusCode::GONE, "session closed").into_response();
    }
    (
        StatusCode::ACCEPTED,
        [(SESSION_HEADER, session_id)],
        "accepted",
    )
        .into_response()
}

/// GET a resumable event stream for a session. With `Last-Event-Id`, replays
/// everything recorded after it before switching to live broadcast traffic.
async fn get_events(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(session_id) = query.session_id.or_else(|| {
        headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()).map(String::from)
    }) else {
        return (StatusCode::BAD_REQUEST, "missing sessionId").into_response();
    };
    let handle = state.get_or_create_session(&session_id);
    let last_event_id = headers.get(LAST_EVENT_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
    let event_store = state.event_store.clone();
    let mut receiver = handle.broadcast.subscribe();

    let stream = async_stream::stream! {
        if let Some(last_event_id) = last_event_id {
            let mut backlog = Vec::new();
            match event_store
                .replay_events_after(&last_event_id, |event| backlog.push(event.message.clone()))
                .await
            {
                Ok(_) => {
                    for line in backlog {
                        yield Ok::<Event, Infallible>(Event::default().data(line));
                    }
                }
                Err(err) => tracing::warn!(error = %err, last_event_id, "failed to replay backlog on reconnect"),
            }
        }
        loop {
            match receiver.recv().await {
                Ok(line) => yield Ok(Event::default().data(line)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE subscriber lagged, some frames were dropped from its view");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

pub fn router(state: Arc<HttpState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/mcp", post(post_message))
        .route("/mcp", get(get_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
