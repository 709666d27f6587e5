//! Streaming bus, spec.md §4.12 (C9). In-process pub/sub keyed by
//! `workflow_id`, seq-ordered per workflow, with a bounded replay buffer so
//! late subscribers can resume from a cursor. Wire shape is
//! `shannon_contracts::StreamEnvelope`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use shannon_contracts::{EventType, StreamEnvelope};
use tokio::sync::broadcast;

struct WorkflowChannel {
    sender: broadcast::Sender<StreamEnvelope>,
    replay: VecDeque<StreamEnvelope>,
    next_seq: u64,
}

/// Owns one `broadcast` channel and replay buffer per active workflow.
/// Guarded by a single mutex, matching spec.md §5 "the streaming bus
/// subscription registry, guarded by a read-write lock" (a `parking_lot`
/// `Mutex` here since the registry is small and short-held).
pub struct StreamBus {
    channels: Mutex<HashMap<String, WorkflowChannel>>,
    replay_buffer_size: usize,
}

impl StreamBus {
    pub fn new(replay_buffer_size: usize) -> Self {
        Self { channels: Mutex::new(HashMap::new()), replay_buffer_size }
    }

    fn ensure_channel<'a>(
        channels: &'a mut HashMap<String, WorkflowChannel>,
        workflow_id: &str,
    ) -> &'a mut WorkflowChannel {
        channels.entry(workflow_id.to_string()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(256);
            WorkflowChannel { sender, replay: VecDeque::new(), next_seq: 0 }
        })
    }

    /// `EmitTaskUpdate`: assign the next seq number for this workflow and
    /// publish. Sequence numbers are monotonically increasing per workflow
    /// (spec.md §5 ordering guarantee); there is no caller-supplied seq.
    pub fn emit(
        &self,
        workflow_id: &str,
        ts_ms: i64,
        event_type: EventType,
        agent_id: Option<String>,
        payload: serde_json::Value,
    ) -> StreamEnvelope {
        let mut channels = self.channels.lock();
        let channel = Self::ensure_channel(&mut channels, workflow_id);
        let seq = channel.next_seq;
        channel.next_seq += 1;
        let envelope = StreamEnvelope {
            workflow_id: workflow_id.to_string(),
            seq,
            ts_ms,
            event_type,
            agent_id,
            payload,
        };
        channel.replay.push_back(envelope.clone());
        if channel.replay.len() > self.replay_buffer_size {
            channel.replay.pop_front();
        }
        // No active subscribers is not an error; broadcast::send only fails
        // when the receiver count is zero.
        let _ = channel.sender.send(envelope.clone());
        envelope
    }

    /// Subscribe from a given seq cursor (inclusive). Events still held in
    /// the replay buffer are returned immediately; live events arrive on
    /// the returned receiver afterward.
    pub fn subscribe_from(
        &self,
        workflow_id: &str,
        cursor: Option<u64>,
    ) -> (Vec<StreamEnvelope>, broadcast::Receiver<StreamEnvelope>) {
        let mut channels = self.channels.lock();
        let channel = Self::ensure_channel(&mut channels, workflow_id);
        let backlog = match cursor {
            Some(from) => channel.replay.iter().filter(|e| e.seq >= from).cloned().collect(),
            None => Vec::new(),
        };
        (backlog, channel.sender.subscribe())
    }

    /// Drop a workflow's channel once it has reached a terminal event,
    /// freeing the replay buffer. Safe to call even if subscribers remain;
    /// they keep their already-cloned `Receiver`.
    pub fn retire(&self, workflow_id: &str) {
        self.channels.lock().remove(workflow_id);
    }
}

pub type SharedStreamBus = Arc<StreamBus>;

/// Adapter-shaped conversion for SSE framing: `id: <seq>` plus a JSON data
/// line, matching spec.md §6 "SSE `id:` field carries sequence for resume".
pub fn to_sse_frame(envelope: &StreamEnvelope) -> String {
    let data = serde_json::to_string(envelope).unwrap_or_default();
    format!("id: {}\nevent: {:?}\ndata: {data}\n\n", envelope.seq, envelope.event_type)
}

/// WebSocket frames carry the raw envelope as a single JSON text message;
/// no special framing is required beyond what the transport already gives.
pub fn to_ws_message(envelope: &StreamEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_default()
}
