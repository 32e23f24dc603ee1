//! Onion-style middleware pipeline: `chain = middleware.wrap(chain)` for
//! each middleware in declared order, walked outer→inner on the way in and
//! inner→outer as post-processing unwinds.

pub mod checks;
pub mod logging;
pub mod rate_limit;

use async_trait::async_trait;
use chatmcp_core::Context;
use chatmcp_protocol::McpResult;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub use checks::ChecksMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Request,
    Notification,
}

/// What one middleware sees for a single invocation. `manifest_kind`/`key`
/// are populated for `tools/call`, `prompts/get` and `resources/read` so
/// rate-limit and checks middleware can look the manifest up without
/// re-parsing `message`.
pub struct MiddlewareContext<'a> {
    pub method: &'a str,
    pub event_type: EventType,
    pub timestamp: Instant,
    pub context: &'a Context,
    pub manifest_kind: Option<chatmcp_core::Kind>,
    pub manifest_key: Option<&'a str>,
    pub params: &'a Value,
}

/// The terminal (or next middleware) a piece of middleware invokes once it's
/// done with its own pre-processing.
#[async_trait]
pub trait Next: Send + Sync {
    async fn call(&self, ctx: &MiddlewareContext<'_>) -> McpResult<Value>;
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &MiddlewareContext<'_>, next: &dyn Next) -> McpResult<Value>;
}

struct Terminal<F>(F);

#[async_trait]
impl<F> Next for Terminal<F>
where
    F: Fn(&MiddlewareContext<'_>) -> futures::future::BoxFuture<'static, McpResult<Value>> + Send + Sync,
{
    async fn call(&self, ctx: &MiddlewareContext<'_>) -> McpResult<Value> {
        (self.0)(ctx).await
    }
}

struct Wrapped {
    middleware: Arc<dyn Middleware>,
    inner: Box<dyn Next>,
}

#[async_trait]
impl Next for Wrapped {
    async fn call(&self, ctx: &MiddlewareContext<'_>) -> McpResult<Value> {
        self.middleware.handle(ctx, self.inner.as_ref()).await
    }
}

/// Ordered chain of middleware, rebuilt whenever the set changes. Dispatch
/// table registrations (which method maps to which handler) are kept
/// entirely separate, so rebuilding the chain never touches them.
#[derive(Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Run `ctx` through every middleware in order, innermost call being
    /// `terminal`.
    pub async fn run<T>(&self, ctx: &MiddlewareContext<'_>, terminal: T) -> McpResult<Value>
    where
        T: Fn(&MiddlewareContext<'_>) -> futures::future::BoxFuture<'static, McpResult<Value>> + Send + Sync + 'static,
    {
        let mut chain: Box<dyn Next> = Box::new(Terminal(terminal));
        for middleware in self.middlewares.iter().rev() {
            chain = Box::new(Wrapped {
                middleware: middleware.clone(),
                inner: chain,
            });
        }
        chain.call(ctx).await
    }
}

/// Builds the default chain: Logging (outermost) → RateLimit → Checks.
pub fn default_pipeline(
    rate_limit: Arc<RateLimitMiddleware>,
    checks: Arc<ChecksMiddleware>,
) -> Pipeline {
    Pipeline::new()
        .with(Arc::new(LoggingMiddleware::new()))
        .with(rate_limit)
        .with(checks)
}
