//! Shannon Contracts - Wire-level request/response shapes for the orchestrator.
//!
//! These types model the RPC boundary described in spec.md §6. They are the
//! *only* place string-typed context maps are allowed to live; everything
//! downstream of `SubmitTaskRequest::into_typed_context` works with a typed
//! struct instead (see Design Notes in spec.md §9: "String-typed context maps").

mod context;
mod policy;
mod schedule;
mod stream;
mod task;

pub use context::{TaskContext, normalize_bool};
pub use policy::{Environment, PolicyDecisionInput, PolicyDecisionOutput};
pub use schedule::{Schedule, ScheduleRun, ScheduleRunStatus};
pub use stream::{EventType, StreamEnvelope, StreamFilter};
pub use task::{
    ControlState, GetStatusResponse, ModelTier, Priority, SubmitTaskRequest, SubmitTaskResponse,
    TaskMode, TaskStatus, TemplateRef, UsageSummary,
};
