//! End-to-end scenarios driven through a real [`Session`] + [`Dispatcher`]
//! pair, wired up the same way the stdio and HTTP transports do it but
//! without any actual I/O. Each test sends raw JSON-RPC frames through
//! `Session::handle_line` and reads the frames the session writes back.

use async_trait::async_trait;
use chatmcp_core::manifest::{Callback, ResourceCallback, ToolCallback};
use chatmcp_core::{
    ArgSchema, Context, CooldownConfig, Kind, Manifest, ParamSchema, ParamType, Transport,
};
use chatmcp_protocol::types::{CallToolResult, ReadResourceResult, ResourceContents};
use chatmcp_protocol::{JsonRpcMessage, JsonRpcResponsePayload, McpResult};
use chatmcp_server::event_store::InMemoryEventStore;
use chatmcp_server::server::ServerBuilder;
use chatmcp_server::session::Session;
use chatmcp_server::testing::{test_server_builder, MockPlatformClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Echo(&'static str);

#[async_trait]
impl ToolCallback for Echo {
    async fn call(&self, _ctx: &Context, _arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        Ok(CallToolResult::text(self.0))
    }
}

struct Add;

#[async_trait]
impl ToolCallback for Add {
    async fn call(&self, _ctx: &Context, arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        let a = arguments["a"].as_i64().expect("coerced to integer");
        let b = arguments["b"].as_i64().expect("coerced to integer");
        Ok(CallToolResult::text((a + b).to_string()))
    }
}

/// Sleeps until cancelled, or 10s, whichever comes first, so the
/// cancellation scenario doesn't depend on the handler itself racing
/// against the session's own `select!`.
struct SleepUntilCancelled;

#[async_trait]
impl ToolCallback for SleepUntilCancelled {
    async fn call(&self, ctx: &Context, _arguments: HashMap<String, Value>) -> McpResult<CallToolResult> {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(10)) => Ok(CallToolResult::text("finished")),
            _ = ctx.cancelled() => Ok(CallToolResult::text("cancelled cooperatively")),
        }
    }
}

struct UserResource;

#[async_trait]
impl ResourceCallback for UserResource {
    async fn read(&self, _ctx: &Context, uri: &str, params: HashMap<String, String>) -> McpResult<ReadResourceResult> {
        let user_id = &params["user_id"];
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: Some(json!({"id": user_id}).to_string()),
                blob: None,
            }],
        })
    }
}

fn tool_manifest(key: &str, callback: Arc<dyn ToolCallback>, schema: Option<ArgSchema>, cooldown: Option<CooldownConfig>) -> Manifest {
    Manifest {
        kind: Kind::Tool,
        key: key.to_string(),
        title: None,
        description: None,
        callback: Callback::Tool(callback),
        enabled: true,
        checks: Vec::new(),
        cooldown,
        tool: Some(Default::default()),
        resource: None,
        prompt: None,
        autocomplete_args: Vec::new(),
        schema,
    }
}

async fn session_harness(builder: ServerBuilder) -> (Arc<Session>, Arc<chatmcp_server::Dispatcher>, mpsc::Receiver<JsonRpcMessage>) {
    let server = builder.build(MockPlatformClient::new()).await.unwrap();
    let (outbound_tx, outbound_rx) = mpsc::channel(16);
    let session = Session::new("s1", Transport::Stdio, outbound_tx, server.platform.clone());
    (session, server.dispatcher.clone(), outbound_rx)
}

async fn recv_response(outbound: &mut mpsc::Receiver<JsonRpcMessage>) -> chatmcp_protocol::JsonRpcResponse {
    match tokio::time::timeout(Duration::from_secs(2), outbound.recv()).await {
        Ok(Some(JsonRpcMessage::Response(response))) => response,
        other => panic!("expected a response frame, got {other:?}"),
    }
}

#[tokio::test]
async fn tool_list_returns_registered_manifest() {
    let (builder, _) = test_server_builder("scenario");
    let builder = builder
        .register_manifest(tool_manifest("get_latency", Arc::new(Echo("42ms")), None, None))
        .unwrap();
    let (session, dispatcher, mut outbound) = session_harness(builder).await;

    session
        .clone()
        .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#.to_string(), dispatcher)
        .await;

    let response = recv_response(&mut outbound).await;
    let JsonRpcResponsePayload::Result { result } = response.payload else {
        panic!("expected a result payload");
    };
    assert_eq!(result["tools"][0]["name"], "get_latency");
    assert_eq!(result["tools"][0]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn tool_call_coerces_string_arguments() {
    let schema = ArgSchema::new(vec![
        ParamSchema::new("a", ParamType::Integer),
        ParamSchema::new("b", ParamType::Integer),
    ]);
    let (builder, _) = test_server_builder("scenario");
    let builder = builder
        .register_manifest(tool_manifest("add", Arc::new(Add), Some(schema), None))
        .unwrap();
    let (session, dispatcher, mut outbound) = session_harness(builder).await;

    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": "add", "arguments": {"a": "2", "b": "3"}},
    });
    session.clone().handle_line(request.to_string(), dispatcher).await;

    let response = recv_response(&mut outbound).await;
    let JsonRpcResponsePayload::Result { result } = response.payload else {
        panic!("expected a result payload");
    };
    assert_eq!(result["content"][0]["text"], "5");
}

#[tokio::test]
async fn second_call_within_window_is_rate_limited() {
    let (builder, _) = test_server_builder("scenario");
    let builder = builder
        .register_manifest(tool_manifest(
            "ping",
            Arc::new(Echo("pong")),
            None,
            Some(CooldownConfig::fixed_window(1, 60.0)),
        ))
        .unwrap();
    let (session, dispatcher, mut outbound) = session_harness(builder).await;

    let call = json!({
        "jsonrpc": "2.0", "id": 1, "method": "tools/call",
        "params": {"name": "ping", "arguments": {}},
    });
    session.clone().handle_line(call.to_string(), dispatcher.clone()).await;
    let first = recv_response(&mut outbound).await;
    assert!(!first.is_error());

    let call_again = json!({
        "jsonrpc": "2.0", "id": 2, "method": "tools/call",
        "params": {"name": "ping", "arguments": {}},
    });
    session.clone().handle_line(call_again.to_string(), dispatcher).await;
    let second = recv_response(&mut outbound).await;
    assert!(second.is_error());
    let JsonRpcResponsePayload::Error { error } = second.payload else {
        panic!("expected an error payload");
    };
    assert_eq!(error.code, chatmcp_protocol::ErrorKind::RateLimitExceeded.code());
    let data = error.data.expect("rate limit error carries stats");
    assert_eq!(data["remaining"], 0);
    assert!(data["retry_after"].as_f64().unwrap() > 0.0);
    assert!(data["retry_after"].as_f64().unwrap() <= 60.0);
}

#[tokio::test]
async fn cancelled_request_completes_within_a_second() {
    let (builder, _) = test_server_builder("scenario");
    let builder = builder
        .register_manifest(tool_manifest("long_task", Arc::new(SleepUntilCancelled), None, None))
        .unwrap();
    let (session, dispatcher, mut outbound) = session_harness(builder).await;

    let call = json!({
        "jsonrpc": "2.0", "id": 7, "method": "tools/call",
        "params": {"name": "long_task", "arguments": {}},
    });
    session.clone().handle_line(call.to_string(), dispatcher.clone()).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let cancel = json!({
        "jsonrpc": "2.0", "method": "notifications/cancelled",
        "params": {"requestId": 7},
    });
    session.clone().handle_line(cancel.to_string(), dispatcher).await;

    let started = tokio::time::Instant::now();
    let response = recv_response(&mut outbound).await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(response.id, Some(chatmcp_protocol::RequestId::Number(7)));
    assert!(outbound.try_recv().is_err(), "no further frames for the cancelled id");
}

#[tokio::test]
async fn http_replay_sends_only_events_after_the_given_id() {
    let adapter = Arc::new(InMemoryEventStore::new());
    let (builder, platform) = test_server_builder("scenario");
    let server = builder.event_adapter(adapter).build(platform).await.unwrap();

    let e1 = server.event_store.store_event("session-a", "first").await.unwrap();
    let _e2 = server.event_store.store_event("session-a", "second").await.unwrap();
    let _e3 = server.event_store.store_event("session-a", "third").await.unwrap();

    let mut replayed = Vec::new();
    let stream = server
        .event_store
        .replay_events_after(&e1, |event| replayed.push(event.message.clone()))
        .await
        .unwrap();

    assert_eq!(stream, Some("session-a".to_string()));
    assert_eq!(replayed, vec!["second".to_string(), "third".to_string()]);
}

#[tokio::test]
async fn resource_template_lookup_fails_cleanly_without_the_id_segment() {
    let (builder, _) = test_server_builder("scenario");
    let builder = builder
        .register_manifest(Manifest {
            kind: Kind::Resource,
            key: "resource://user/{user_id}".to_string(),
            title: None,
            description: None,
            callback: Callback::Resource(Arc::new(UserResource)),
            enabled: true,
            checks: Vec::new(),
            cooldown: None,
            tool: None,
            resource: Some(chatmcp_core::manifest::ResourceExtras {
                uri_template: "resource://user/{user_id}".to_string(),
                mime_type: "application/json".to_string(),
                is_template: true,
            }),
            prompt: None,
            autocomplete_args: Vec::new(),
            schema: None,
        })
        .unwrap();
    let (session, dispatcher, mut outbound) = session_harness(builder).await;

    let found = json!({
        "jsonrpc": "2.0", "id": 1, "method": "resources/read",
        "params": {"uri": "resource://user/42"},
    });
    session.clone().handle_line(found.to_string(), dispatcher.clone()).await;
    let response = recv_response(&mut outbound).await;
    let JsonRpcResponsePayload::Result { result } = response.payload else {
        panic!("expected a result payload");
    };
    assert!(result["contents"][0]["text"].as_str().unwrap().contains("42"));

    let missing = json!({
        "jsonrpc": "2.0", "id": 2, "method": "resources/read",
        "params": {"uri": "resource://user"},
    });
    session.clone().handle_line(missing.to_string(), dispatcher).await;
    let response = recv_response(&mut outbound).await;
    assert!(response.is_error());
    let JsonRpcResponsePayload::Error { error } = response.payload else {
        panic!("expected an error payload");
    };
    assert_eq!(error.code, chatmcp_protocol::ErrorKind::ResourceNotFound.code());
}
