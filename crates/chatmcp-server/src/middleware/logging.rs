//! Outermost middleware: stamps a tracing span around every request and
//! notification, logs duration and outcome on exit.

use super::{Middleware, MiddlewareContext, Next};
use async_trait::async_trait;
use chatmcp_protocol::McpResult;
use serde_json::Value;
use tracing::Instrument;

#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &MiddlewareContext<'_>, next: &dyn Next) -> McpResult<Value> {
        let span = tracing::info_span!(
            "mcp_request",
            method = ctx.method,
            event_type = ?ctx.event_type,
            request_id = %ctx.context.request_id,
        );
        async move {
            let started = ctx.timestamp;
            let result = next.call(ctx).await;
            let elapsed = started.elapsed();
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "request completed"),
                Err(err) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    kind = ?err.kind,
                    "request failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

