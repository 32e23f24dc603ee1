//! Wire types for the chat-platform MCP server.
//!
//! This crate owns the JSON-RPC envelope, every MCP request/response payload,
//! and the error taxonomy those payloads are built from. It has no knowledge
//! of the chat platform, of manifests, or of how requests get dispatched —
//! those live in `chatmcp-core` and `chatmcp-server`.

pub mod error;
pub mod jsonrpc;
pub mod types;

pub use error::{ErrorKind, McpError, McpResult};
pub use jsonrpc::{
    JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, JsonRpcVersion, RequestId,
};
