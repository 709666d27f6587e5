use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A unit of agent work, spec.md §3 "Subtask". Created by decomposition,
/// consumed by execution, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique within its Workflow Execution.
    pub index: usize,
    pub description: String,
    pub dependencies: Vec<usize>,
    pub tool_allowlist: Vec<String>,
    pub token_budget: u64,
    pub retry_policy: RetryPolicy,
    /// If true, downstream subtasks may proceed even if this one fails
    /// (spec.md §4.2 step 4, §8 property 5).
    pub best_effort: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    /// Matches the activity default in spec.md §4.10: "3 retries with
    /// jitter".
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl Subtask {
    /// Verify that a set of subtasks has unique indices and an acyclic
    /// dependency graph, spec.md §3 invariants.
    pub fn validate_graph(subtasks: &[Subtask]) -> Result<(), String> {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        for s in subtasks {
            if !seen.insert(s.index) {
                return Err(format!("duplicate subtask index {}", s.index));
            }
        }
        for s in subtasks {
            for dep in &s.dependencies {
                if !seen.contains(dep) {
                    return Err(format!(
                        "subtask {} depends on unknown index {}",
                        s.index, dep
                    ));
                }
            }
        }
        if has_cycle(subtasks) {
            return Err("dependency cycle detected".to_string());
        }
        Ok(())
    }
}

fn has_cycle(subtasks: &[Subtask]) -> bool {
    use std::collections::HashMap;

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let by_index: HashMap<usize, &Subtask> = subtasks.iter().map(|s| (s.index, s)).collect();
    let mut marks: HashMap<usize, Mark> =
        subtasks.iter().map(|s| (s.index, Mark::Unvisited)).collect();

    fn visit(
        idx: usize,
        by_index: &HashMap<usize, &Subtask>,
        marks: &mut HashMap<usize, Mark>,
    ) -> bool {
        match marks.get(&idx).copied().unwrap_or(Mark::Unvisited) {
            Mark::Done => return false,
            Mark::InProgress => return true,
            Mark::Unvisited => {}
        }
        marks.insert(idx, Mark::InProgress);
        if let Some(s) = by_index.get(&idx) {
            for &dep in &s.dependencies {
                if visit(dep, by_index, marks) {
                    return true;
                }
            }
        }
        marks.insert(idx, Mark::Done);
        false
    }

    for &idx in by_index.keys() {
        if visit(idx, &by_index, &mut marks) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask(index: usize, deps: &[usize]) -> Subtask {
        Subtask {
            index,
            description: format!("task {index}"),
            dependencies: deps.to_vec(),
            tool_allowlist: vec![],
            token_budget: 1000,
            retry_policy: RetryPolicy::default(),
            best_effort: false,
        }
    }

    #[test]
    fn accepts_acyclic_graph() {
        let subtasks = vec![subtask(0, &[]), subtask(1, &[0]), subtask(2, &[0, 1])];
        assert!(Subtask::validate_graph(&subtasks).is_ok());
    }

    #[test]
    fn rejects_cycle() {
        let subtasks = vec![subtask(0, &[1]), subtask(1, &[0])];
        assert!(Subtask::validate_graph(&subtasks).is_err());
    }

    #[test]
    fn rejects_duplicate_index() {
        let subtasks = vec![subtask(0, &[]), subtask(0, &[])];
        assert!(Subtask::validate_graph(&subtasks).is_err());
    }

    #[test]
    fn rejects_unknown_dependency() {
        let subtasks = vec![subtask(0, &[99])];
        assert!(Subtask::validate_graph(&subtasks).is_err());
    }
}
