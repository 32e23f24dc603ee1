//! The MCP error taxonomy: one [`ErrorKind`] per wire error code, one
//! [`McpError`] type threaded through the whole engine, and a single
//! conversion point into a wire-level [`JsonRpcErrorObject`].

use crate::jsonrpc::JsonRpcErrorObject;
use serde_json::Value;

/// Result alias used throughout the engine.
pub type McpResult<T> = Result<T, McpError>;

/// Error classification with its protocol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    Internal,
    ResourceNotFound,
    ResourceReadError,
    PromptNotFound,
    PromptRenderError,
    Disabled,
    RateLimitExceeded,
    PermissionDenied,
    CheckFailure,
    /// Not part of the wire taxonomy proper (-32000); used internally to
    /// signal a session tearing down while a request is still in flight.
    ConnectionClosed,
}

impl ErrorKind {
    /// The JSON-RPC error code for this kind.
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::Parse => -32700,
            ErrorKind::InvalidRequest => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParams => -32602,
            ErrorKind::Internal => -32603,
            ErrorKind::ResourceNotFound => -32001,
            ErrorKind::ResourceReadError => -32002,
            ErrorKind::PromptNotFound => -32003,
            ErrorKind::PromptRenderError => -32004,
            ErrorKind::Disabled => -32005,
            ErrorKind::RateLimitExceeded => -32006,
            ErrorKind::PermissionDenied => -32007,
            ErrorKind::CheckFailure => -32008,
            ErrorKind::ConnectionClosed => -32000,
        }
    }
}

/// The single error type propagated by handlers, middleware and the session
/// runtime. Carries optional structured `data` (e.g. rate-limit stats).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct McpError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        let method = method.into();
        Self::new(ErrorKind::MethodNotFound, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self::new(ErrorKind::ResourceNotFound, format!("resource not found: {uri}"))
    }

    pub fn resource_read_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceReadError, message)
    }

    pub fn prompt_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::PromptNotFound, format!("prompt not found: {name}"))
    }

    pub fn prompt_render_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PromptRenderError, message)
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::Disabled, format!("{name} is disabled"))
    }

    pub fn rate_limit_exceeded(message: impl Into<String>, stats: Value) -> Self {
        Self::new(ErrorKind::RateLimitExceeded, message).with_data(stats)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn check_failure(predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        Self::new(ErrorKind::CheckFailure, format!("check failed: {predicate}"))
    }

    pub fn connection_closed() -> Self {
        Self::new(ErrorKind::ConnectionClosed, "connection closed")
    }

    /// Convert into the wire-level JSON-RPC error object sent to clients.
    pub fn into_wire(self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.kind.code(),
            message: self.message,
            data: self.data,
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        McpError::parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_taxonomy() {
        assert_eq!(ErrorKind::Parse.code(), -32700);
        assert_eq!(ErrorKind::InvalidRequest.code(), -32600);
        assert_eq!(ErrorKind::MethodNotFound.code(), -32601);
        assert_eq!(ErrorKind::InvalidParams.code(), -32602);
        assert_eq!(ErrorKind::Internal.code(), -32603);
        assert_eq!(ErrorKind::ResourceNotFound.code(), -32001);
        assert_eq!(ErrorKind::ResourceReadError.code(), -32002);
        assert_eq!(ErrorKind::PromptNotFound.code(), -32003);
        assert_eq!(ErrorKind::PromptRenderError.code(), -32004);
        assert_eq!(ErrorKind::Disabled.code(), -32005);
        assert_eq!(ErrorKind::RateLimitExceeded.code(), -32006);
        assert_eq!(ErrorKind::PermissionDenied.code(), -32007);
        assert_eq!(ErrorKind::CheckFailure.code(), -32008);
    }

    #[test]
    fn rate_limit_error_carries_stats() {
        let stats = serde_json::json!({"remaining": 0, "retry_after": 12.0});
        let err = McpError::rate_limit_exceeded("too many requests", stats.clone());
        assert_eq!(err.data, Some(stats));
        let wire = err.into_wire();
        assert_eq!(wire.code, -32006);
    }
}
