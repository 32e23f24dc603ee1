//! The three manifest registries the dispatcher consults: tools, resources
//! (concrete + templates, sharing one registry keyed by URI/URI template),
//! and prompts.

use chatmcp_core::{Kind, Registry};

pub struct Managers {
    pub tools: Registry,
    pub resources: Registry,
    pub prompts: Registry,
}

impl Managers {
    pub fn new() -> Self {
        Self {
            tools: Registry::new(Kind::Tool),
            resources: Registry::new(Kind::Resource),
            prompts: Registry::new(Kind::Prompt),
        }
    }
}

impl Default for Managers {
    fn default() -> Self {
        Self::new()
    }
}
