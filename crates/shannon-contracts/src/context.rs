use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::task::SubmitTaskRequest;

/// Normalize a string-encoded boolean. Case-insensitive `true`/`1` are
/// truthy; everything else (including absence) is falsy. See spec.md §9,
/// "String-typed context maps... booleans encoded as strings must be
/// normalized".
pub fn normalize_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// Typed view over `SubmitTaskRequest::context`, converted immediately at
/// the RPC boundary per the Design Notes. Workflow/activity code never reads
/// the raw string map again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    pub template: Option<String>,
    pub force_research: bool,
    pub role: Option<String>,
    /// Anything not recognized above, kept for forward compatibility and
    /// passed through to activities verbatim.
    pub extra: HashMap<String, String>,
}

impl TaskContext {
    pub fn from_request(req: &SubmitTaskRequest) -> Self {
        let mut extra = HashMap::new();
        let mut ctx = TaskContext::default();
        for (k, v) in &req.context {
            match k.as_str() {
                "template" => ctx.template = Some(v.clone()),
                "force_research" => ctx.force_research = normalize_bool(v),
                "role" => ctx.role = Some(v.clone()),
                _ => {
                    extra.insert(k.clone(), v.clone());
                }
            }
        }
        ctx.extra = extra;
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_insensitive_bool() {
        assert!(normalize_bool("TRUE"));
        assert!(normalize_bool("1"));
        assert!(normalize_bool(" true "));
        assert!(!normalize_bool("0"));
        assert!(!normalize_bool("false"));
        assert!(!normalize_bool("yes"));
    }

    #[test]
    fn extracts_known_keys_and_keeps_rest() {
        let mut context = HashMap::new();
        context.insert("force_research".to_string(), "1".to_string());
        context.insert("role".to_string(), "researcher".to_string());
        context.insert("foo".to_string(), "bar".to_string());
        let req = SubmitTaskRequest {
            query: "q".into(),
            session_id: "s".into(),
            user_id: "u".into(),
            tenant_id: None,
            mode: None,
            model_tier: None,
            model_override: None,
            provider_override: None,
            context,
            labels: HashMap::new(),
            template: None,
            idempotency_key: None,
            traceparent: None,
        };
        let ctx = TaskContext::from_request(&req);
        assert!(ctx.force_research);
        assert_eq!(ctx.role.as_deref(), Some("researcher"));
        assert_eq!(ctx.extra.get("foo"), Some(&"bar".to_string()));
        assert!(ctx.template.is_none());
    }
}
