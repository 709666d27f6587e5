//! Centralized complex→standard→simple degradation table, resolving the
//! Open Question in spec.md §9 ("Degradation policy... an implementer
//! should centralize the policy table rather than scattering thresholds").

use shannon_contracts::TaskMode;
use shannon_models::Strategy;

/// One notch down the demotion ladder, or `None` if already at the floor.
pub fn demote_mode(mode: TaskMode) -> Option<TaskMode> {
    match mode {
        TaskMode::Supervisor => Some(TaskMode::Complex),
        TaskMode::Complex => Some(TaskMode::Standard),
        TaskMode::Standard => Some(TaskMode::Simple),
        TaskMode::Simple => None,
    }
}

/// The strategy a demoted mode maps to, independent of complexity/learning
/// signal — used once budget is near its limit (spec.md §4.9
/// "Degradation. On budget-near-limit: strategies demote... per config").
pub fn demoted_strategy(mode: TaskMode) -> Strategy {
    match mode {
        TaskMode::Supervisor => Strategy::Supervisor,
        TaskMode::Complex => Strategy::Dag,
        TaskMode::Standard => Strategy::Dag,
        TaskMode::Simple => Strategy::Simple,
    }
}

/// Whether `strategy` has a degradation path at all. `Simple` is the floor;
/// `InvalidDecomposition` also degrades to `Simple` regardless of mode
/// (spec.md §4.2 edge case, §7 `InvalidDecomposition`).
pub fn has_degradation_path(strategy: Strategy) -> bool {
    !matches!(strategy, Strategy::Simple)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_terminates_at_simple() {
        let mut mode = TaskMode::Supervisor;
        let mut steps = 0;
        while let Some(next) = demote_mode(mode) {
            mode = next;
            steps += 1;
            assert!(steps <= 3, "demotion ladder should terminate quickly");
        }
        assert_eq!(mode, TaskMode::Simple);
    }

    #[test]
    fn simple_has_no_further_demotion() {
        assert_eq!(demote_mode(TaskMode::Simple), None);
        assert!(!has_degradation_path(Strategy::Simple));
    }
}
