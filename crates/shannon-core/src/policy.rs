//! Policy decision engine, spec.md §4.9 "Policy decision" / §6 "Policy
//! decision input". Classifies query text into an explicit
//! {safe, suspicious, dangerous} tier via substring pattern matching.

use shannon_contracts::{Environment, PolicyDecisionInput, PolicyDecisionOutput, TaskMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Safe,
    Suspicious,
    Dangerous,
}

/// Case-insensitive substring sets of hard-coded deny phrases rather than a
/// learned classifier, matching spec.md's "match case-insensitive
/// substrings".
pub struct QueryPatterns {
    pub dangerous: Vec<String>,
    pub suspicious: Vec<String>,
}

impl Default for QueryPatterns {
    fn default() -> Self {
        Self {
            dangerous: vec![
                "delete all files".to_string(),
                "rm -rf /".to_string(),
                "drop database".to_string(),
                "format disk".to_string(),
                "exfiltrate".to_string(),
            ],
            suspicious: vec![
                "delete".to_string(),
                "sudo".to_string(),
                "credentials".to_string(),
                "private key".to_string(),
                "bypass".to_string(),
            ],
        }
    }
}

impl QueryPatterns {
    pub fn classify(&self, query: &str) -> QueryClass {
        let lower = query.to_ascii_lowercase();
        if self.dangerous.iter().any(|p| lower.contains(p.as_str())) {
            return QueryClass::Dangerous;
        }
        if self.suspicious.iter().any(|p| lower.contains(p.as_str())) {
            return QueryClass::Suspicious;
        }
        QueryClass::Safe
    }
}

pub struct PolicyEngine {
    patterns: QueryPatterns,
}

impl PolicyEngine {
    pub fn new(patterns: QueryPatterns) -> Self {
        Self { patterns }
    }

    /// `{allow, require_approval, reason}` per spec.md §4.9. Dev environment
    /// short-circuits to allow regardless of query class (the budget cap
    /// itself is still enforced separately by the budget manager — this
    /// engine never mutates budget state).
    pub fn decide(&self, input: &PolicyDecisionInput) -> PolicyDecisionOutput {
        if input.environment == Environment::Dev {
            return PolicyDecisionOutput { allow: true, reason: None, require_approval: false };
        }

        match self.patterns.classify(&input.query) {
            QueryClass::Dangerous => PolicyDecisionOutput {
                allow: false,
                reason: Some("dangerous pattern detected".to_string()),
                require_approval: false,
            },
            QueryClass::Suspicious => {
                let require_approval = input.mode == TaskMode::Complex
                    && input.environment == Environment::Production;
                PolicyDecisionOutput {
                    allow: true,
                    reason: Some("suspicious pattern detected".to_string()),
                    require_approval,
                }
            }
            QueryClass::Safe => {
                PolicyDecisionOutput { allow: true, reason: None, require_approval: false }
            }
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(QueryPatterns::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(query: &str, mode: TaskMode, env: Environment) -> PolicyDecisionInput {
        PolicyDecisionInput {
            query: query.to_string(),
            user_id: "u1".to_string(),
            tenant_id: None,
            mode,
            token_budget: 1000,
            agent_id: None,
            environment: env,
        }
    }

    #[test]
    fn dangerous_query_denied_regardless_of_mode() {
        let engine = PolicyEngine::default();
        let decision =
            engine.decide(&input("please delete all files now", TaskMode::Simple, Environment::Production));
        assert!(!decision.allow);
        assert_eq!(decision.reason.as_deref(), Some("dangerous pattern detected"));
    }

    #[test]
    fn suspicious_requires_approval_only_in_complex_production() {
        let engine = PolicyEngine::default();
        let complex_prod =
            engine.decide(&input("please delete the temp file", TaskMode::Complex, Environment::Production));
        assert!(complex_prod.allow);
        assert!(complex_prod.require_approval);

        let standard_prod =
            engine.decide(&input("please delete the temp file", TaskMode::Standard, Environment::Production));
        assert!(!standard_prod.require_approval);
    }

    #[test]
    fn dev_environment_short_circuits_to_allow() {
        let engine = PolicyEngine::default();
        let decision =
            engine.decide(&input("delete all files", TaskMode::Complex, Environment::Dev));
        assert!(decision.allow);
        assert!(!decision.require_approval);
    }

    #[test]
    fn safe_query_allowed_without_approval() {
        let engine = PolicyEngine::default();
        let decision =
            engine.decide(&input("what is 2+2", TaskMode::Standard, Environment::Production));
        assert!(decision.allow);
        assert!(!decision.require_approval);
        assert!(decision.reason.is_none());
    }
}
