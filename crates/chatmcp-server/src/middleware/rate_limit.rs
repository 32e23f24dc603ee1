//! Rate-limit middleware: for `tools/call`, `prompts/get` and
//! `resources/read`, looks the manifest up and, if it carries a cooldown,
//! updates its bucket before letting the call proceed.

use super::{Middleware, MiddlewareContext, Next};
use crate::rate_limit::CooldownManager;
use chatmcp_core::Kind;
use chatmcp_protocol::McpResult;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// One `CooldownManager` per manifest that declares a cooldown, keyed by
/// (kind, key) the same way the registries are.
#[derive(Default)]
pub struct RateLimitMiddleware {
    managers: DashMap<(Kind, String), Arc<CooldownManager>>,
}

impl RateLimitMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: Kind, key: impl Into<String>, manager: Arc<CooldownManager>) {
        self.managers.insert((kind, key.into()), manager);
    }

    fn manager_for(&self, kind: Kind, key: &str) -> Option<Arc<CooldownManager>> {
        self.managers.get(&(kind, key.to_string())).map(|entry| entry.value().clone())
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, ctx: &MiddlewareContext<'_>, next: &dyn Next) -> McpResult<Value> {
        let (Some(kind), Some(key)) = (ctx.manifest_kind, ctx.manifest_key) else {
            return next.call(ctx).await;
        };
        if let Some(manager) = self.manager_for(kind, key) {
            let session_id = ctx.context.session_id.as_deref();
            if !manager.update_bucket(session_id, 1) {
                let stats = manager.stats(session_id);
                return Err(chatmcp_protocol::McpError::rate_limit_exceeded(
                    format!("rate limit exceeded for {kind} '{key}': {stats:?}"),
                    serde_json::to_value(stats).unwrap_or(Value::Null),
                ));
            }
        }
        next.call(ctx).await
    }
}
