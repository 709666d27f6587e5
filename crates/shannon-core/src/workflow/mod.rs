//! Workflow execution harness (C1 surrogate). See `context` for the
//! determinism-centerpiece discussion.

pub mod context;

pub use context::{HistoryEntry, SignalBus, WorkflowContext};
