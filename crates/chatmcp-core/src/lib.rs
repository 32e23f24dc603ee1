//! Platform abstraction, manifest/registry, schema coercion, and the
//! per-request context shared by the whole engine.
//!
//! This crate has no notion of transports, middleware ordering, or the
//! session read loop — those live in `chatmcp-server`. What it owns is the
//! data the rest of the engine is built from: what a manifest looks like,
//! how arguments get coerced, and what a callback sees when it runs.

pub mod context;
pub mod manifest;
pub mod platform;
pub mod rate_limit;
pub mod registry;
pub mod schema;

pub use context::{Context, ServerAccess, ServerHandle, Transport};
pub use manifest::{Callback, Check, Kind, Manifest, PromptCallback, ResourceCallback, ToolCallback};
pub use platform::{Channel, Guild, Message, PlatformClient, Role, User};
pub use rate_limit::{CooldownConfig, RateLimitAlgorithm, RateLimitStats};
pub use registry::Registry;
pub use schema::{AdapterCache, ArgSchema, ParamSchema, ParamType};
