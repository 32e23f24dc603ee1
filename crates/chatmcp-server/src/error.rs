//! Engine-level errors that don't correspond to a single MCP request (e.g.
//! startup/registration failures) plus their conversion into [`McpError`].

use chatmcp_protocol::{ErrorKind, McpError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("duplicate handler registered for method '{0}'")]
    DuplicateMethodHandler(String),
    #[error("plugin registration failed: {0}")]
    PluginRegistration(String),
    #[error(transparent)]
    Manifest(#[from] McpError),
    #[error("platform client error: {0}")]
    Platform(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Manifest(e) => e,
            other => McpError::new(ErrorKind::Internal, other.to_string()),
        }
    }
}
