//! Bootstrap surface for the chat-platform MCP server: the `Plugin`
//! registration contract plugins implement, and the example plugins that
//! ship with this binary.

pub mod demo_platform;
pub mod env;
pub mod plugins;

use async_trait::async_trait;
use chatmcp_server::error::ServerError;
use chatmcp_server::ServerBuilder;

/// One unit of pluggable functionality: a named bundle of tools, resources
/// and/or prompts. Discovery is explicit — the binary lists which plugins to
/// register rather than scanning for them, matching how every other manifest
/// in this engine gets wired in at startup.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register this plugin's manifests onto `builder`, returning it back
    /// (or a registration error) so plugins compose via `?`.
    fn register(&self, builder: ServerBuilder) -> Result<ServerBuilder, ServerError>;
}

/// Applies an ordered list of plugins to a builder, one after another.
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn with(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn register_all(self, mut builder: ServerBuilder) -> Result<ServerBuilder, ServerError> {
        for plugin in &self.plugins {
            tracing::debug!(plugin = plugin.name(), "registering plugin");
            builder = plugin.register(builder)?;
        }
        Ok(builder)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
