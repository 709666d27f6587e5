//! Shannon orchestration core: the durable workflow harness, cognitive
//! strategies, activities, budget/policy enforcement, and the learning
//! router. One module per subsystem, re-exported flat from the crate root.

pub mod activities;
pub mod approval;
pub mod budget;
pub mod bus;
pub mod capability;
pub mod config;
pub mod error;
pub mod learning;
pub mod memory;
pub mod naming;
pub mod orchestrator;
pub mod persistence;
pub mod policy;
pub mod role;
pub mod router;
pub mod schedule;
pub mod session;
pub mod strategies;
pub mod template;
pub mod workflow;

pub use activities::{Activities, DefaultActivities};
pub use config::ShannonConfig;
pub use error::{Result, ShannonError};
pub use learning::LearningRouter;
pub use orchestrator::Orchestrator;
pub use router::Router;
pub use strategies::{StrategyInput, StrategyOutput, StrategyRunner};
pub use workflow::{HistoryEntry, SignalBus, WorkflowContext};
