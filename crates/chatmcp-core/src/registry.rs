//! Per-kind manifest storage. Written once at startup during plugin
//! discovery, read lock-free for the rest of the process's life.

use crate::manifest::{Kind, Manifest};
use chatmcp_protocol::McpError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Indexes manifests of one [`Kind`] by their key (tool/prompt name, or
/// resource URI/template), preserving registration order so `list_enabled`
/// gives deterministic, order-stable results to clients.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<IndexMap<String, Arc<Manifest>>>,
    kind: Kind,
}

impl Registry {
    pub fn new(kind: Kind) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            kind,
        }
    }

    /// Register a manifest. A duplicate key — even if the existing entry is
    /// disabled — is a startup error: `enabled=false` still occupies its key.
    pub fn add(&self, manifest: Manifest) -> Result<(), McpError> {
        assert_eq!(manifest.kind, self.kind, "manifest kind does not match registry");
        let key = manifest.key.clone();
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(McpError::invalid_request(format!(
                "duplicate {} registration for key '{key}'",
                self.kind
            )));
        }
        entries.insert(key, Arc::new(manifest));
        Ok(())
    }

    /// Look up a manifest by key. Returns the manifest even if disabled;
    /// callers that must honor `enabled=false` as absence use
    /// [`Registry::get_enabled`].
    pub fn get(&self, key: &str) -> Option<Arc<Manifest>> {
        self.entries.read().get(key).cloned()
    }

    /// Look up a manifest by key, treating a disabled manifest as absent.
    pub fn get_enabled(&self, key: &str) -> Option<Arc<Manifest>> {
        self.get(key).filter(|m| m.enabled)
    }

    /// All enabled manifests, for `*/list` responses, in the order they were
    /// registered.
    pub fn list_enabled(&self) -> Vec<Arc<Manifest>> {
        self.entries.read().values().filter(|m| m.enabled).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Callback, ToolCallback};
    use async_trait::async_trait;
    use chatmcp_protocol::types::CallToolResult;
    use chatmcp_protocol::McpResult;
    use std::collections::HashMap;

    struct Noop;

    #[async_trait]
    impl ToolCallback for Noop {
        async fn call(
            &self,
            _ctx: &crate::context::Context,
            _arguments: HashMap<String, serde_json::Value>,
        ) -> McpResult<CallToolResult> {
            Ok(CallToolResult::text("ok"))
        }
    }

    fn manifest(key: &str, enabled: bool) -> Manifest {
        Manifest {
            kind: Kind::Tool,
            key: key.to_string(),
            title: None,
            description: None,
            callback: Callback::Tool(Arc::new(Noop)),
            enabled,
            checks: Vec::new(),
            cooldown: None,
            tool: Some(Default::default()),
            resource: None,
            prompt: None,
            autocomplete_args: Vec::new(),
            schema: None,
        }
    }

    #[test]
    fn duplicate_key_is_rejected_even_if_disabled() {
        let registry = Registry::new(Kind::Tool);
        registry.add(manifest("echo", true)).unwrap();
        let err = registry.add(manifest("echo", false)).unwrap_err();
        assert_eq!(err.kind, chatmcp_protocol::ErrorKind::InvalidRequest);
    }

    #[test]
    fn disabled_manifest_is_invisible_to_get_enabled() {
        let registry = Registry::new(Kind::Tool);
        registry.add(manifest("echo", false)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get_enabled("echo").is_none());
        assert!(registry.list_enabled().is_empty());
    }

    #[test]
    fn list_enabled_preserves_registration_order() {
        let registry = Registry::new(Kind::Tool);
        registry.add(manifest("zeta", true)).unwrap();
        registry.add(manifest("alpha", true)).unwrap();
        registry.add(manifest("mid", true)).unwrap();
        let keys: Vec<_> = registry.list_enabled().iter().map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()]);
    }
}
