//! Checks middleware: runs a manifest's ordered predicates before letting
//! the call through; the first falsy (or erroring) check aborts the chain.

use super::{Middleware, MiddlewareContext, Next};
use chatmcp_core::{Check, Kind};
use chatmcp_protocol::{McpError, McpResult};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

#[derive(Default)]
pub struct ChecksMiddleware {
    checks: DashMap<(Kind, String), Vec<Arc<dyn Check>>>,
}

impl ChecksMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: Kind, key: impl Into<String>, checks: Vec<Arc<dyn Check>>) {
        self.checks.insert((kind, key.into()), checks);
    }
}

#[async_trait::async_trait]
impl Middleware for ChecksMiddleware {
    async fn handle(&self, ctx: &MiddlewareContext<'_>, next: &dyn Next) -> McpResult<Value> {
        let (Some(kind), Some(key)) = (ctx.manifest_kind, ctx.manifest_key) else {
            return next.call(ctx).await;
        };
        if let Some(checks) = self.checks.get(&(kind, key.to_string())).map(|e| e.value().clone()) {
            for check in &checks {
                match check.evaluate(ctx.context).await {
                    Ok(true) => continue,
                    Ok(false) => return Err(McpError::check_failure(check.name())),
                    Err(err) => return Err(err),
                }
            }
        }
        next.call(ctx).await
    }
}
