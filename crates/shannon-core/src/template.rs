//! Template compiler surrogate, SPEC_FULL.md §3 Supplemented. spec.md §4.1
//! step 1 references an external "template compiler" yielding a precomputed
//! Subtask graph and strategy; modeled here as an in-process registry of
//! precompiled templates the router resolves by name+version.

use std::collections::HashMap;

use parking_lot::RwLock;
use shannon_models::{Strategy, Subtask};

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub version: String,
    pub strategy: Strategy,
    pub subtasks: Vec<Subtask>,
    /// Resolves the Open Question in spec.md §9: "Template-override mode
    /// bypasses the base synthesis contract... the safe default is to
    /// require templates to opt in to citation responsibility." Defaults to
    /// `false`.
    pub requires_citations: bool,
}

#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<(String, String), Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, template: Template) {
        self.templates
            .write()
            .insert((template.name.clone(), template.version.clone()), template);
    }

    pub fn resolve(&self, name: &str, version: &str) -> Option<Template> {
        self.templates.read().get(&(name.to_string(), version.to_string())).cloned()
    }

    /// Resolve the newest registered version for a name, used when a
    /// `TemplateRef` omits a version.
    pub fn resolve_latest(&self, name: &str) -> Option<Template> {
        self.templates
            .read()
            .values()
            .filter(|t| t.name == name)
            .max_by(|a, b| a.version.cmp(&b.version))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_models::subtask::RetryPolicy;

    fn template(name: &str, version: &str) -> Template {
        Template {
            name: name.to_string(),
            version: version.to_string(),
            strategy: Strategy::Dag,
            subtasks: vec![Subtask {
                index: 0,
                description: "step".to_string(),
                dependencies: vec![],
                tool_allowlist: vec![],
                token_budget: 500,
                retry_policy: RetryPolicy::default(),
                best_effort: false,
            }],
            requires_citations: false,
        }
    }

    #[test]
    fn resolves_by_exact_name_and_version() {
        let registry = TemplateRegistry::new();
        registry.register(template("summarize", "v1"));
        assert!(registry.resolve("summarize", "v1").is_some());
        assert!(registry.resolve("summarize", "v2").is_none());
    }

    #[test]
    fn resolve_latest_picks_max_version_string() {
        let registry = TemplateRegistry::new();
        registry.register(template("summarize", "v1"));
        registry.register(template("summarize", "v2"));
        let latest = registry.resolve_latest("summarize").unwrap();
        assert_eq!(latest.version, "v2");
    }

    #[test]
    fn defaults_to_not_requiring_citations() {
        let t = template("custom", "v1");
        assert!(!t.requires_citations);
    }
}
