//! Human-in-the-loop approval, spec.md §4.13: `RequestApproval` suspends the
//! workflow on a named signal, racing it against a timer so a non-response
//! fails closed after `ApprovalConfig::timeout_secs` rather than hanging
//! forever.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShannonError};
use crate::workflow::WorkflowContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub workflow_id: String,
    pub reason: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approved: bool,
    pub responder: Option<String>,
    pub note: Option<String>,
}

fn signal_name(workflow_id: &str) -> String {
    format!("approval:{workflow_id}")
}

/// Suspend on the workflow's approval signal, racing it against
/// `timeout_secs`. The activity-style call itself is NOT recorded as a
/// `HistoryEntry::Activity` — `WorkflowContext::await_signal` already
/// records a `Signal` entry, and the timer path (on timeout) records a
/// `Timer` entry, so either branch leaves a faithful, replayable trace.
pub async fn request_approval(
    ctx: &WorkflowContext,
    request: &ApprovalRequest,
    timeout_secs: u64,
) -> Result<ApprovalResponse> {
    let name = signal_name(&request.workflow_id);

    tokio::select! {
        biased;
        signal_result = ctx.await_signal(&name) => {
            let payload = signal_result?;
            serde_json::from_value(payload)
                .map_err(|e| ShannonError::internal(format!("deserialize approval response: {e}")))
        }
        timer_result = ctx.start_timer(Duration::from_secs(timeout_secs)) => {
            timer_result?;
            Err(ShannonError::ApprovalTimeout)
        }
    }
}

/// `ProcessApprovalResponse`: the external caller's half of the handshake —
/// delivers a decision onto the workflow's `SignalBus`, unblocking whichever
/// `request_approval` call is waiting on this workflow ID.
pub fn process_approval_response(
    signals: &crate::workflow::SignalBus,
    workflow_id: &str,
    response: ApprovalResponse,
) -> Result<()> {
    let payload = serde_json::to_value(&response)
        .map_err(|e| ShannonError::internal(format!("serialize approval response: {e}")))?;
    signals.deliver(&signal_name(workflow_id), payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn approval_delivered_before_timeout_unblocks_immediately() {
        let signals = Arc::new(crate::workflow::SignalBus::new());
        let ctx = WorkflowContext::recording("wf-appr", signals.clone());

        let request = ApprovalRequest {
            workflow_id: "wf-appr".into(),
            reason: "spend exceeds soft budget".into(),
            payload: serde_json::json!({}),
        };

        process_approval_response(
            &signals,
            "wf-appr",
            ApprovalResponse { approved: true, responder: Some("alice".into()), note: None },
        )
        .unwrap();

        let response = request_approval(&ctx, &request, 900).await.unwrap();
        assert!(response.approved);
        assert_eq!(response.responder.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn missing_response_times_out() {
        let ctx = WorkflowContext::recording("wf-appr-2", Arc::new(crate::workflow::SignalBus::new()));
        let request = ApprovalRequest {
            workflow_id: "wf-appr-2".into(),
            reason: "policy flagged tool use".into(),
            payload: serde_json::json!({}),
        };
        let result = request_approval(&ctx, &request, 0).await;
        assert!(matches!(result, Err(ShannonError::ApprovalTimeout)));
    }
}
