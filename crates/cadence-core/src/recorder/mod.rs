//! Session recorder boundary.
//!
//! The engine hands every [`CompletedSegment`] to a [`SessionRecorder`]
//! running on a [`BackgroundRecorder`] worker, so the countdown never waits
//! on the sink. Recording is best-effort: a failing sink produces a
//! `RecordingFailed` event, never a changed or rolled-back session.

mod background;

pub use background::BackgroundRecorder;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecordingFailed;

/// One completed or interrupted run of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSegment {
    pub session_id: Uuid,
    pub technique: String,
    pub phase_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
}

/// Persistence collaborator supplied by the host.
pub trait SessionRecorder: Send {
    fn record(&mut self, segment: &CompletedSegment) -> Result<(), RecordingFailed>;
}

impl<F> SessionRecorder for F
where
    F: FnMut(&CompletedSegment) -> Result<(), RecordingFailed> + Send,
{
    fn record(&mut self, segment: &CompletedSegment) -> Result<(), RecordingFailed> {
        self(segment)
    }
}

/// Keeps segments in a shared list. Clones observe the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    segments: Arc<Mutex<Vec<CompletedSegment>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> Vec<CompletedSegment> {
        self.segments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn total_seconds(&self) -> u64 {
        self.segments().iter().map(|s| s.duration_seconds).sum()
    }
}

impl SessionRecorder for MemoryRecorder {
    fn record(&mut self, segment: &CompletedSegment) -> Result<(), RecordingFailed> {
        let mut segments = self
            .segments
            .lock()
            .map_err(|_| RecordingFailed::new(&segment.phase_name, "segment list poisoned"))?;
        segments.push(segment.clone());
        Ok(())
    }
}
