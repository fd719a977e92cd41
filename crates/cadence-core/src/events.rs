use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recorder::CompletedSegment;
use crate::timer::SessionSnapshot;

/// Every state change of a session produces an Event.
/// Hosts render from them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        technique: String,
        phase_name: String,
        duration_secs: u64,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran out or was interrupted by a pause.
    SegmentCompleted {
        segment: CompletedSegment,
    },
    PhaseAdvanced {
        phase_index: usize,
        phase_name: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    CycleCompleted {
        completed_cycles: u32,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        completed_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// The recorder sink rejected a segment. The timer keeps going.
    RecordingFailed {
        phase_name: String,
        reason: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn recording_failed(failure: crate::error::RecordingFailed) -> Self {
        Event::RecordingFailed {
            phase_name: failure.phase_name,
            reason: failure.reason,
            at: Utc::now(),
        }
    }
}
