//! Shannon Models - domain entities shared across the orchestration core.
//!
//! Mirrors spec.md §3 "Data Model": these are semantic types, not wire
//! types (those live in `shannon-contracts`) and not storage row types
//! (those live in `shannon-storage`).

pub mod agent;
pub mod budget;
pub mod memory;
pub mod pattern;
pub mod session;
pub mod strategy;
pub mod subtask;
pub mod task;
pub mod workflow;

pub use agent::{AgentInvocation, InvocationStatus, ToolCall, ToolCallOutcome};
pub use budget::{BudgetBreach, BudgetLedger};
pub use memory::{MemoryItem, MemoryScope};
pub use pattern::PatternRecord;
pub use session::Session;
pub use strategy::Strategy;
pub use subtask::{RetryPolicy, Subtask};
pub use task::Task;
pub use workflow::{WorkflowEvent, WorkflowExecution, WorkflowLifecycle};
