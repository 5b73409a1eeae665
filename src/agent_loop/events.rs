//! Run event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::RunId;

/// Callback used for streaming run events.
pub type RunEventSink = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Concrete event payloads emitted by the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventPayload {
    RunStarted {
        agent: String,
    },
    TurnStarted {
        turn: usize,
        agent: String,
    },
    ToolCalled {
        agent: String,
        call_id: String,
        tool_name: String,
    },
    ToolCompleted {
        agent: String,
        call_id: String,
        tool_name: String,
        is_error: bool,
    },
    HandoffCompleted {
        from: String,
        to: String,
    },
    HandoffRejected {
        agent: String,
        requested: String,
    },
    RunCompleted {
        last_agent: String,
        turns: usize,
    },
    RunFailed {
        error: String,
    },
}

/// Envelope for run events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: RunEventPayload,
}

pub(crate) struct RunEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<RunEventSink>,
}

impl RunEventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<RunEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: RunEventPayload) {
        let Some(sink) = &self.sink else { return };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(RunEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }
}
