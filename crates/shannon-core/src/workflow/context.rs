//! The deterministic workflow/replay harness — the architectural centerpiece
//! called out in SPEC_FULL.md §2. No durable-execution crate exists anywhere
//! in the retrieval pack (fabricating a dependency on one would violate the
//! "never fabricate dependencies" rule), so C1 is modeled here as an
//! in-process `WorkflowContext` that workflows suspend through at exactly
//! the points spec.md §5 allows (activity/child/timer/signal), recording
//! each suspension as a `HistoryEntry`. Replaying the same workflow body
//! against a previously recorded history must reproduce the identical
//! sequence of activity invocations (spec.md §8 property 1); any divergence
//! raises `ShannonError::NonDeterminism` rather than silently proceeding.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::error::{Result, ShannonError};

/// One entry in a workflow's suspension-point history. Order is
/// significant: it *is* the replay contract.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HistoryEntry {
    Activity { name: String, input: Value, output: Value },
    Timer { duration_ms: u64 },
    Signal { name: String, payload: Value },
    ChildWorkflow { workflow_type: String, input: Value, output: Value },
}

/// Delivered signals the context can pull from, keyed by signal name.
/// Shared across the workflow's lifetime (the router hands the same
/// `SignalBus` to `RequestApproval`/`ProcessApprovalResponse`).
#[derive(Default)]
pub struct SignalBus {
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
    notify: Notify,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver(&self, name: &str, payload: Value) {
        self.queues.lock().entry(name.to_string()).or_default().push_back(payload);
        self.notify.notify_waiters();
    }

    fn try_take(&self, name: &str) -> Option<Value> {
        self.queues.lock().get_mut(name).and_then(|q| q.pop_front())
    }

    /// Await a named signal, waking whenever any signal is delivered and
    /// re-checking. Callers should race this against a workflow timer for
    /// timeout semantics (spec.md §4.13).
    pub async fn wait_for(&self, name: &str) -> Value {
        loop {
            if let Some(value) = self.try_take(name) {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

enum Mode {
    Recording { log: Mutex<Vec<HistoryEntry>> },
    Replay { history: Vec<HistoryEntry>, cursor: Mutex<usize> },
}

/// The handle strategy workflows are written against. `recording()` is used
/// for live execution; `replay()` re-runs the same workflow body against a
/// previously captured `Vec<HistoryEntry>` to verify determinism.
pub struct WorkflowContext {
    workflow_id: String,
    mode: Mode,
    signals: Arc<SignalBus>,
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

impl WorkflowContext {
    pub fn recording(workflow_id: impl Into<String>, signals: Arc<SignalBus>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            mode: Mode::Recording { log: Mutex::new(Vec::new()) },
            signals,
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn replay(workflow_id: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            mode: Mode::Replay { history, cursor: Mutex::new(0) },
            signals: Arc::new(SignalBus::new()),
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.mode, Mode::Replay { .. })
    }

    pub fn cancellation_handle(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.cancelled.clone()
    }

    /// spec.md §5 "Workflows propagate cancellation... to all running
    /// activities". Checked at every suspension point below.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        match &self.mode {
            Mode::Recording { log } => log.lock().clone(),
            Mode::Replay { history, .. } => history.clone(),
        }
    }

    /// Run (or replay) one activity invocation. `name` plus the serialized
    /// `input` form the determinism key: a replay that requests a different
    /// activity, or the same activity with different input, at this point
    /// in the sequence is `NonDeterminism` (spec.md §7).
    pub async fn run_activity<T, F, Fut>(&self, name: &str, input: Value, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(ShannonError::Internal("workflow cancelled".to_string()));
        }
        match &self.mode {
            Mode::Recording { log } => {
                let output = call().await?;
                let output_json = serde_json::to_value(&output)
                    .map_err(|e| ShannonError::internal(format!("serialize activity output: {e}")))?;
                log.lock().push(HistoryEntry::Activity {
                    name: name.to_string(),
                    input,
                    output: output_json,
                });
                Ok(output)
            }
            Mode::Replay { history, cursor } => {
                let mut c = cursor.lock();
                let entry = history.get(*c).cloned().ok_or_else(|| {
                    ShannonError::NonDeterminism(format!(
                        "history exhausted at step {}, expected activity '{name}'",
                        *c
                    ))
                })?;
                match entry {
                    HistoryEntry::Activity { name: recorded_name, input: recorded_input, output } => {
                        if recorded_name != name || recorded_input != input {
                            return Err(ShannonError::NonDeterminism(format!(
                                "replay mismatch at step {}: recorded ({recorded_name}, {recorded_input}), got ({name}, {input})",
                                *c
                            )));
                        }
                        *c += 1;
                        serde_json::from_value(output).map_err(|e| {
                            ShannonError::internal(format!("deserialize replayed activity output: {e}"))
                        })
                    }
                    other => Err(ShannonError::NonDeterminism(format!(
                        "replay mismatch at step {}: recorded {other:?}, got activity '{name}'",
                        *c
                    ))),
                }
            }
        }
    }

    /// Start a workflow timer. Recording mode actually sleeps (honoring real
    /// backpressure waits / timeouts in live execution); replay mode resolves
    /// immediately since no new real time should elapse re-deriving history
    /// we already trust.
    pub async fn start_timer(&self, duration: Duration) -> Result<()> {
        if self.is_cancelled() {
            return Err(ShannonError::Internal("workflow cancelled".to_string()));
        }
        match &self.mode {
            Mode::Recording { log } => {
                tokio::time::sleep(duration).await;
                log.lock().push(HistoryEntry::Timer { duration_ms: duration.as_millis() as u64 });
                Ok(())
            }
            Mode::Replay { history, cursor } => {
                let mut c = cursor.lock();
                let entry = history.get(*c).cloned().ok_or_else(|| {
                    ShannonError::NonDeterminism(format!("history exhausted at step {}, expected timer", *c))
                })?;
                match entry {
                    HistoryEntry::Timer { .. } => {
                        *c += 1;
                        Ok(())
                    }
                    other => Err(ShannonError::NonDeterminism(format!(
                        "replay mismatch at step {}: recorded {other:?}, got timer",
                        *c
                    ))),
                }
            }
        }
    }

    /// Await a named signal (e.g. an approval decision), racing it against a
    /// workflow timer for timeout semantics is the caller's responsibility
    /// (see `crate::approval`).
    pub async fn await_signal(&self, name: &str) -> Result<Value> {
        match &self.mode {
            Mode::Recording { log } => {
                let payload = self.signals.wait_for(name).await;
                log.lock().push(HistoryEntry::Signal { name: name.to_string(), payload: payload.clone() });
                Ok(payload)
            }
            Mode::Replay { history, cursor } => {
                let mut c = cursor.lock();
                let entry = history.get(*c).cloned().ok_or_else(|| {
                    ShannonError::NonDeterminism(format!(
                        "history exhausted at step {}, expected signal '{name}'",
                        *c
                    ))
                })?;
                match entry {
                    HistoryEntry::Signal { name: recorded_name, payload } => {
                        if recorded_name != name {
                            return Err(ShannonError::NonDeterminism(format!(
                                "replay mismatch at step {}: recorded signal '{recorded_name}', got '{name}'",
                                *c
                            )));
                        }
                        *c += 1;
                        Ok(payload)
                    }
                    other => Err(ShannonError::NonDeterminism(format!(
                        "replay mismatch at step {}: recorded {other:?}, got signal '{name}'",
                        *c
                    ))),
                }
            }
        }
    }

    pub fn signal_bus(&self) -> Arc<SignalBus> {
        self.signals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn sample_workflow(ctx: &WorkflowContext) -> Result<String> {
        let a: i64 = ctx
            .run_activity("double", json!({"n": 2}), || async { Ok::<i64, ShannonError>(4) })
            .await?;
        let b: i64 = ctx
            .run_activity("double", json!({"n": a}), || async { Ok::<i64, ShannonError>(8) })
            .await?;
        Ok(format!("result={b}"))
    }

    #[tokio::test]
    async fn replay_reproduces_identical_result() {
        let ctx = WorkflowContext::recording("wf-1", Arc::new(SignalBus::new()));
        let live_result = sample_workflow(&ctx).await.unwrap();
        let history = ctx.history();

        let replay_ctx = WorkflowContext::replay("wf-1", history);
        let replayed_result = sample_workflow(&replay_ctx).await.unwrap();

        assert_eq!(live_result, replayed_result);
    }

    #[tokio::test]
    async fn replay_detects_divergent_activity_input() {
        let ctx = WorkflowContext::recording("wf-1", Arc::new(SignalBus::new()));
        sample_workflow(&ctx).await.unwrap();
        let mut history = ctx.history();
        if let HistoryEntry::Activity { input, .. } = &mut history[1] {
            *input = json!({"n": 999});
        }

        let replay_ctx = WorkflowContext::replay("wf-1", history);
        let result = replay_ctx
            .run_activity("double", json!({"n": 2}), || async { Ok::<i64, ShannonError>(4) })
            .await;
        assert!(result.is_ok());
        let second = replay_ctx
            .run_activity("double", json!({"n": 4}), || async { Ok::<i64, ShannonError>(8) })
            .await;
        assert!(matches!(second, Err(ShannonError::NonDeterminism(_))));
    }

    #[tokio::test]
    async fn cancellation_blocks_further_activities() {
        let ctx = WorkflowContext::recording("wf-1", Arc::new(SignalBus::new()));
        ctx.cancel();
        let result = ctx
            .run_activity("noop", json!({}), || async { Ok::<(), ShannonError>(()) })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn signal_bus_delivers_to_waiter() {
        let bus = Arc::new(SignalBus::new());
        let ctx = WorkflowContext::recording("wf-1", bus.clone());
        bus.deliver("approval", json!({"approve": true}));
        let payload = ctx.await_signal("approval").await.unwrap();
        assert_eq!(payload, json!({"approve": true}));
    }
}
