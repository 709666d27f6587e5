//! Role Service surrogate, SPEC_FULL.md §3 Supplemented. spec.md §4.1 step 4
//! references an external "Role Service" that seeds tool allowlist and
//! system prompt; this crate models it as an in-process registry rather than
//! a remote collaborator, following the same narrow-interface pattern used
//! for vector/relational stores elsewhere in this spec.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub system_prompt_fragment: String,
    pub tool_allowlist: Vec<String>,
}

#[derive(Default)]
pub struct RoleRegistry {
    roles: RwLock<HashMap<String, Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, role: Role) {
        self.roles.write().insert(role.name.clone(), role);
    }

    pub fn get(&self, name: &str) -> Option<Role> {
        self.roles.read().get(name).cloned()
    }

    /// Built-ins mirroring the strategy names this corpus already uses as
    /// agent personas (e.g. the debate strategy's persona prompts).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(Role {
            name: "researcher".to_string(),
            system_prompt_fragment: "You are a meticulous researcher who cites sources.".to_string(),
            tool_allowlist: vec!["web_search".to_string(), "fetch_url".to_string()],
        });
        registry.register(Role {
            name: "coder".to_string(),
            system_prompt_fragment: "You are a careful software engineer.".to_string(),
            tool_allowlist: vec!["execute_code".to_string(), "read_file".to_string()],
        });
        registry.register(Role {
            name: "analyst".to_string(),
            system_prompt_fragment: "You analyze data and summarize findings precisely.".to_string(),
            tool_allowlist: vec!["run_query".to_string()],
        });
        registry
    }
}
