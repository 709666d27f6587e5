//! Deterministic agent naming, spec.md §4.10 / §3 invariant "Deterministic
//! agent name = f(workflowID, reservedIndex)" and §8 property 8. Uses an
//! `fnv`-family hasher, adequate for non-adversarial keys; the pool itself is
//! fixed per Design Notes "Dynamic agent name pool" — changing it is a
//! breaking replay change.

use fnv::FnvHasher;
use std::hash::Hasher;

/// Reserved index ranges, spec.md §4.10 "0-49 main subtasks, 100+ prefetch,
/// 200 synthesis".
pub const MAIN_SUBTASK_RANGE: std::ops::Range<u32> = 0..50;
pub const PREFETCH_BASE: u32 = 100;
pub const SYNTHESIS_INDEX: u32 = 200;

/// Fixed name pool. Memorable deterministic labels read better than raw
/// UUIDs in agent-facing logs.
const NAME_POOL: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "xray", "yankee", "zulu", "atlas", "boreas", "cassius",
    "drake", "ember", "falcon", "gibson", "harlan", "ibis", "jasper", "kestrel", "lyra", "magnus",
    "nova",
];

/// FNV-1a 32-bit hash, spec.md §4.10 "fnv32a(workflowID)".
pub fn fnv32a(input: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(input.as_bytes());
    (hasher.finish() & 0xFFFF_FFFF) as u32
}

/// `GetAgentName`: pick(stationNamePool, (fnv32a(workflowID) + reservedIndex)
/// mod |pool|). Pure function of its inputs — safe to call from workflow
/// code since it performs no I/O and reads no ambient state.
pub fn agent_name(workflow_id: &str, reserved_index: u32) -> String {
    let hash = fnv32a(workflow_id);
    let slot = hash.wrapping_add(reserved_index) as usize % NAME_POOL.len();
    NAME_POOL[slot].to_string()
}

pub fn main_subtask_name(workflow_id: &str, subtask_index: usize) -> String {
    let index = (subtask_index as u32) % (MAIN_SUBTASK_RANGE.end - MAIN_SUBTASK_RANGE.start);
    agent_name(workflow_id, MAIN_SUBTASK_RANGE.start + index)
}

pub fn prefetch_agent_name(workflow_id: &str, slot: u32) -> String {
    agent_name(workflow_id, PREFETCH_BASE + slot)
}

pub fn synthesis_agent_name(workflow_id: &str) -> String {
    agent_name(workflow_id, SYNTHESIS_INDEX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_yield_same_name() {
        let a = agent_name("wf-123", 0);
        let b = agent_name("wf-123", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_indices_can_diverge() {
        let a = agent_name("wf-123", 0);
        let b = agent_name("wf-123", 1);
        // not a hard guarantee of inequality for every pool size, but for
        // this 41-entry pool and typical hashes they diverge; assert the
        // function is at least index-sensitive in general.
        let distinct = (0..10).map(|i| agent_name("wf-123", i)).collect::<std::collections::HashSet<_>>();
        assert!(distinct.len() > 1);
        let _ = (a, b);
    }

    #[test]
    fn main_subtask_indices_wrap_within_range() {
        let names: Vec<_> = (0..100).map(|i| main_subtask_name("wf-abc", i)).collect();
        assert_eq!(names.len(), 100);
        assert_eq!(names[0], names[50]);
    }

    #[test]
    fn stable_across_repeated_hash_computation() {
        assert_eq!(fnv32a("abc"), fnv32a("abc"));
        assert_ne!(fnv32a("abc"), fnv32a("abd"));
    }
}
