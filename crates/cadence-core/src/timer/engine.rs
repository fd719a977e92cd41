//! Interval session engine.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads or read the wall clock to count down - the host calls `tick()`
//! once per elapsed second while the session is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!       Completed
//! (any) -> reset() -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::with_recorder(MemoryRecorder::new())?;
//! engine.start(technique)?;
//! // Once per second:
//! let events = engine.tick()?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cycle::{on_cycle_wrap, resolve_phase_duration};
use super::sequencer::next_index;
use super::technique::{Phase, Technique};
use crate::error::{Action, EngineError};
use crate::events::Event;
use crate::recorder::{BackgroundRecorder, CompletedSegment, SessionRecorder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    /// All cycles ran. Only `reset()` leaves this state.
    Completed,
}

/// Mutable runtime state, owned by exactly one [`SessionEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub active_technique: Option<Technique>,
    pub current_phase_index: usize,
    pub remaining_seconds: u64,
    /// Resolved duration of the current phase, including any long-cycle override.
    pub phase_duration_seconds: u64,
    pub completed_cycles: u32,
    /// Seconds counted in the current segment since it (re)started.
    pub active_segment_elapsed: u64,
    pub segment_started_at: Option<DateTime<Utc>>,
    pub session_id: Option<Uuid>,
}

impl SessionState {
    pub fn current_phase(&self) -> Option<&Phase> {
        self.active_technique
            .as_ref()?
            .phases
            .get(self.current_phase_index)
    }

    /// 0.0 .. 100.0 progress across all cycles of the session.
    pub fn progress_pct(&self) -> f64 {
        let Some(technique) = self.active_technique.as_ref() else {
            return 0.0;
        };
        if self.status == SessionStatus::Completed {
            return 100.0;
        }
        let Some(phase) = self.current_phase() else {
            return 0.0;
        };

        // The long-cycle override stretches only the current pass.
        let cycle_secs = technique
            .cycle_duration_secs()
            .saturating_sub(phase.duration_seconds)
            .saturating_add(self.phase_duration_seconds);
        if cycle_secs == 0 || technique.total_cycles == 0 {
            return 0.0;
        }
        let elapsed_in_phase = self.phase_duration_seconds.saturating_sub(self.remaining_seconds);
        let cycle_fraction =
            technique.cumulative_secs(self.current_phase_index).saturating_add(elapsed_in_phase) as f64 / cycle_secs as f64;
        ((self.completed_cycles as f64 + cycle_fraction) / technique.total_cycles as f64 * 100.0).min(100.0)
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub technique: Option<String>,
    pub phase_index: usize,
    pub phase_name: Option<String>,
    pub instruction: Option<String>,
    pub remaining_secs: u64,
    pub phase_duration_secs: u64,
    pub completed_cycles: u32,
    pub total_cycles: u32,
    pub segment_elapsed_secs: u64,
    pub progress_pct: f64,
}

/// Core session engine.
///
/// Commands never leave the state half-updated: they either apply fully or
/// return an [`EngineError`] with the state untouched.
pub struct SessionEngine {
    state: SessionState,
    recorder: Option<BackgroundRecorder>,
}

impl SessionEngine {
    /// An engine without a recorder. Segments still appear as events.
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            recorder: None,
        }
    }

    /// Record segments on a worker thread so a slow sink cannot stall ticks.
    ///
    /// Failures reported by the sink surface as `RecordingFailed` events from
    /// a later command or from [`SessionEngine::shutdown_recorder`].
    ///
    /// # Errors
    /// Returns an error if the worker thread cannot be spawned.
    pub fn with_recorder<R>(recorder: R) -> std::io::Result<Self>
    where
        R: SessionRecorder + 'static,
    {
        Ok(Self {
            state: SessionState::default(),
            recorder: Some(BackgroundRecorder::spawn(recorder)?),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &self.state;
        let phase = state.current_phase();
        SessionSnapshot {
            status: state.status,
            technique: state.active_technique.as_ref().map(|t| t.name.clone()),
            phase_index: state.current_phase_index,
            phase_name: phase.map(|p| p.name.clone()),
            instruction: phase.map(|p| p.instruction.clone()),
            remaining_secs: state.remaining_seconds,
            phase_duration_secs: state.phase_duration_seconds,
            completed_cycles: state.completed_cycles,
            total_cycles: state.active_technique.as_ref().map(|t| t.total_cycles).unwrap_or(0),
            segment_elapsed_secs: state.active_segment_elapsed,
            progress_pct: state.progress_pct(),
        }
    }

    pub fn snapshot_event(&self) -> Event {
        Event::StateSnapshot {
            snapshot: self.snapshot(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, technique: Technique) -> Result<Vec<Event>, EngineError> {
        self.require(Action::Start, SessionStatus::Idle)?;
        technique.validate()?;

        let mut events = self.collect_failures();
        let now = Utc::now();
        let session_id = Uuid::new_v4();
        let duration = resolve_phase_duration(&technique, 0, 0);

        events.push(Event::SessionStarted {
            session_id,
            technique: technique.key.clone(),
            phase_name: technique.phases[0].name.clone(),
            duration_secs: duration,
            total_cycles: technique.total_cycles,
            at: now,
        });
        info!(technique = %technique.key, %session_id, "session started");

        self.state = SessionState {
            status: SessionStatus::Running,
            active_technique: Some(technique),
            current_phase_index: 0,
            remaining_seconds: duration,
            phase_duration_seconds: duration,
            completed_cycles: 0,
            active_segment_elapsed: 0,
            segment_started_at: Some(now),
            session_id: Some(session_id),
        };
        Ok(events)
    }

    /// Pause the countdown, flushing the partial segment to the recorder.
    pub fn pause(&mut self) -> Result<Vec<Event>, EngineError> {
        self.require(Action::Pause, SessionStatus::Running)?;

        let mut events = self.collect_failures();
        self.state.status = SessionStatus::Paused;
        if let Some(segment) = self.flush_segment() {
            events.extend(self.deliver(segment));
        }
        events.push(Event::SessionPaused {
            phase_index: self.state.current_phase_index,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        });
        debug!(remaining = self.state.remaining_seconds, "session paused");
        Ok(events)
    }

    pub fn resume(&mut self) -> Result<Vec<Event>, EngineError> {
        self.require(Action::Resume, SessionStatus::Paused)?;

        let mut events = self.collect_failures();
        let now = Utc::now();
        self.state.status = SessionStatus::Running;
        self.state.segment_started_at = Some(now);
        events.push(Event::SessionResumed {
            phase_index: self.state.current_phase_index,
            remaining_secs: self.state.remaining_seconds,
            at: now,
        });
        debug!(remaining = self.state.remaining_seconds, "session resumed");
        Ok(events)
    }

    /// Count down one second. Expires the phase when it reaches zero.
    pub fn tick(&mut self) -> Result<Vec<Event>, EngineError> {
        self.require(Action::Tick, SessionStatus::Running)?;

        let mut events = self.collect_failures();
        if self.state.remaining_seconds > 0 {
            self.state.remaining_seconds -= 1;
            self.state.active_segment_elapsed += 1;
        }
        if self.state.remaining_seconds == 0 {
            events.extend(self.advance());
        }
        Ok(events)
    }

    /// Apply `seconds` ticks at once, stopping early if the session ends.
    ///
    /// For hosts that measure how long they were suspended and want to
    /// replay the missed seconds.
    pub fn catch_up(&mut self, seconds: u64) -> Result<Vec<Event>, EngineError> {
        self.require(Action::Tick, SessionStatus::Running)?;

        let mut events = Vec::new();
        for _ in 0..seconds {
            if self.state.status != SessionStatus::Running {
                break;
            }
            events.extend(self.tick()?);
        }
        Ok(events)
    }

    /// Discard the session and return to `Idle`. Never records a segment.
    pub fn reset(&mut self) -> Vec<Event> {
        let mut events = self.collect_failures();
        let previous = std::mem::take(&mut self.state);
        if previous.status != SessionStatus::Idle {
            debug!(status = ?previous.status, "session reset");
        }
        events.push(Event::SessionReset { at: Utc::now() });
        events
    }

    pub fn stop(&mut self) -> Vec<Event> {
        self.reset()
    }

    /// Detach the recorder, waiting for queued segments to be written.
    pub fn shutdown_recorder(&mut self) -> Vec<Event> {
        self.recorder
            .take()
            .map(BackgroundRecorder::shutdown)
            .unwrap_or_default()
            .into_iter()
            .map(Event::recording_failed)
            .collect()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require(&self, action: Action, expected: SessionStatus) -> Result<(), EngineError> {
        if self.state.status == expected {
            return Ok(());
        }
        debug!(%action, status = ?self.state.status, "rejected transition");
        Err(EngineError::InvalidTransition {
            action,
            status: self.state.status,
        })
    }

    /// Close the running segment, if it counted any seconds.
    fn flush_segment(&mut self) -> Option<CompletedSegment> {
        let elapsed = std::mem::take(&mut self.state.active_segment_elapsed);
        let started_at = self.state.segment_started_at.take();
        if elapsed == 0 {
            return None;
        }
        let technique = self.state.active_technique.as_ref()?;
        let phase = technique.phases.get(self.state.current_phase_index)?;
        Some(CompletedSegment {
            session_id: self.state.session_id.unwrap_or_default(),
            technique: technique.key.clone(),
            phase_name: phase.name.clone(),
            started_at: started_at.unwrap_or_else(Utc::now),
            duration_seconds: elapsed,
        })
    }

    fn deliver(&mut self, segment: CompletedSegment) -> Vec<Event> {
        let failure = self
            .recorder
            .as_ref()
            .and_then(|recorder| recorder.submit(segment.clone()).err());
        let mut events = vec![Event::SegmentCompleted { segment }];
        if let Some(failure) = failure {
            warn!(error = %failure, "recording failed; session continues");
            events.push(Event::recording_failed(failure));
        }
        events
    }

    fn collect_failures(&mut self) -> Vec<Event> {
        self.recorder
            .as_mut()
            .map(BackgroundRecorder::drain_failures)
            .unwrap_or_default()
            .into_iter()
            .map(Event::recording_failed)
            .collect()
    }

    /// Move past the expired phase: next phase, next cycle, or completion.
    fn advance(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(segment) = self.flush_segment() {
            events.extend(self.deliver(segment));
        }

        let now = Utc::now();
        let Some(technique) = self.state.active_technique.as_ref() else {
            return events;
        };
        let next = next_index(self.state.current_phase_index, technique.phases.len());

        if next == 0 {
            let wrap = on_cycle_wrap(self.state.completed_cycles, technique.total_cycles);
            self.state.completed_cycles = wrap.completed_cycles;
            events.push(Event::CycleCompleted {
                completed_cycles: wrap.completed_cycles,
                total_cycles: technique.total_cycles,
                at: now,
            });

            if wrap.finished {
                self.state.status = SessionStatus::Completed;
                self.state.remaining_seconds = 0;
                self.state.segment_started_at = None;
                let session_id = self.state.session_id.unwrap_or_default();
                info!(%session_id, cycles = wrap.completed_cycles, "session completed");
                events.push(Event::SessionCompleted {
                    session_id,
                    completed_cycles: wrap.completed_cycles,
                    at: now,
                });
                return events;
            }
        }

        let duration = resolve_phase_duration(technique, next, self.state.completed_cycles);
        let phase_name = technique.phases[next].name.clone();
        self.state.current_phase_index = next;
        self.state.remaining_seconds = duration;
        self.state.phase_duration_seconds = duration;
        self.state.segment_started_at = Some(now);
        debug!(phase = %phase_name, duration, "phase advanced");
        events.push(Event::PhaseAdvanced {
            phase_index: next,
            phase_name,
            duration_secs: duration,
            at: now,
        });
        events
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("has_recorder", &self.recorder.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigurationError, RecordingFailed};
    use crate::recorder::MemoryRecorder;

    fn box_breathing() -> Technique {
        Technique::new(
            "box",
            "Box Breathing",
            vec![
                Phase::new("inhale", 4),
                Phase::new("hold", 4),
                Phase::new("exhale", 4),
                Phase::new("holdAfterExhale", 4),
            ],
            2,
        )
    }

    fn tick_n(engine: &mut SessionEngine, n: usize) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..n {
            events.extend(engine.tick().unwrap());
        }
        events
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = SessionEngine::new();
        assert_eq!(engine.status(), SessionStatus::Idle);

        engine.start(box_breathing()).unwrap();
        assert_eq!(engine.status(), SessionStatus::Running);

        engine.pause().unwrap();
        assert_eq!(engine.status(), SessionStatus::Paused);

        engine.resume().unwrap();
        assert_eq!(engine.status(), SessionStatus::Running);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut engine = SessionEngine::new();
        assert_eq!(
            engine.pause(),
            Err(EngineError::InvalidTransition {
                action: Action::Pause,
                status: SessionStatus::Idle,
            })
        );
        assert!(engine.resume().is_err());
        assert!(engine.tick().is_err());

        engine.start(box_breathing()).unwrap();
        assert!(engine.resume().is_err());
        assert!(engine.start(box_breathing()).is_err());
    }

    #[test]
    fn rejected_technique_leaves_engine_idle() {
        let mut engine = SessionEngine::new();
        let mut broken = box_breathing();
        broken.total_cycles = 0;
        assert!(matches!(
            engine.start(broken),
            Err(EngineError::Configuration(_))
        ));
        assert_eq!(engine.state(), &SessionState::default());
    }

    #[test]
    fn tick_advances_phase_when_countdown_expires() {
        let mut engine = SessionEngine::new();
        engine.start(box_breathing()).unwrap();
        let events = tick_n(&mut engine, 4);
        assert_eq!(engine.state().current_phase_index, 1);
        assert_eq!(engine.state().remaining_seconds, 4);
        assert_eq!(engine.state().active_segment_elapsed, 0);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SegmentCompleted { segment } if segment.phase_name == "inhale" && segment.duration_seconds == 4
        )));
    }

    #[test]
    fn completes_after_all_cycles() {
        let recorder = MemoryRecorder::new();
        let mut engine = SessionEngine::with_recorder(recorder.clone()).unwrap();
        engine.start(box_breathing()).unwrap();
        let events = tick_n(&mut engine, 32);
        assert_eq!(engine.status(), SessionStatus::Completed);
        assert_eq!(engine.state().completed_cycles, 2);
        assert!(matches!(events.last(), Some(Event::SessionCompleted { completed_cycles: 2, .. })));
        assert!(engine.shutdown_recorder().is_empty());
        assert_eq!(recorder.segments().len(), 8);
        assert!(engine.tick().is_err());
    }

    #[test]
    fn pause_flushes_partial_segment() {
        let recorder = MemoryRecorder::new();
        let mut engine = SessionEngine::with_recorder(recorder.clone()).unwrap();
        engine.start(box_breathing()).unwrap();
        tick_n(&mut engine, 3);
        let events = engine.pause().unwrap();
        assert_eq!(engine.state().active_segment_elapsed, 0);
        assert_eq!(engine.state().remaining_seconds, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SegmentCompleted { segment } if segment.duration_seconds == 3
        )));

        engine.resume().unwrap();
        tick_n(&mut engine, 1);
        assert!(engine.shutdown_recorder().is_empty());

        let segments = recorder.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].phase_name, "inhale");
        assert_eq!(segments[0].duration_seconds, 3);
        assert_eq!(segments[1].duration_seconds, 1);
    }

    #[test]
    fn pause_without_elapsed_time_records_nothing() {
        let recorder = MemoryRecorder::new();
        let mut engine = SessionEngine::with_recorder(recorder.clone()).unwrap();
        engine.start(box_breathing()).unwrap();
        engine.pause().unwrap();
        engine.shutdown_recorder();
        assert!(recorder.segments().is_empty());
    }

    #[test]
    fn reset_discards_without_recording() {
        let recorder = MemoryRecorder::new();
        let mut engine = SessionEngine::with_recorder(recorder.clone()).unwrap();
        engine.start(box_breathing()).unwrap();
        tick_n(&mut engine, 2);
        engine.reset();
        assert_eq!(engine.state(), &SessionState::default());
        engine.shutdown_recorder();
        assert!(recorder.segments().is_empty());
    }

    #[test]
    fn recording_failure_is_reported_but_not_fatal() {
        let mut engine = SessionEngine::with_recorder(|s: &CompletedSegment| {
            Err::<(), _>(RecordingFailed::new(&s.phase_name, "offline"))
        })
        .unwrap();
        engine.start(box_breathing()).unwrap();
        let mut events = tick_n(&mut engine, 4);
        events.extend(engine.shutdown_recorder());
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::RecordingFailed { reason, .. } if reason == "offline")));
        assert_eq!(engine.status(), SessionStatus::Running);
        assert_eq!(engine.state().current_phase_index, 1);
    }

    #[test]
    fn slow_recorder_does_not_stall_tick() {
        let mut engine = SessionEngine::with_recorder(|_: &CompletedSegment| {
            std::thread::sleep(std::time::Duration::from_millis(500));
            Ok::<(), RecordingFailed>(())
        })
        .unwrap();
        let technique = Technique::new("quick", "Quick", vec![Phase::new("a", 1), Phase::new("b", 1)], 3);
        engine.start(technique).unwrap();

        let started = std::time::Instant::now();
        let events = tick_n(&mut engine, 4);
        assert!(
            started.elapsed() < std::time::Duration::from_millis(100),
            "tick waited on the recorder for {:?}",
            started.elapsed()
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::SegmentCompleted { .. })).count(),
            4
        );
        assert!(engine.shutdown_recorder().is_empty());
    }

    #[test]
    fn snapshot_survives_huge_durations() {
        let huge = u64::MAX / 2 + 1;
        let mut engine = SessionEngine::new();
        let technique = Technique::new("huge", "Huge", vec![Phase::new("a", huge), Phase::new("b", huge)], 1);
        assert!(matches!(
            engine.start(technique),
            Err(EngineError::Configuration(ConfigurationError::CycleTooLong { .. }))
        ));
        assert_eq!(engine.state(), &SessionState::default());

        let technique = Technique::new("long", "Long", vec![Phase::new("a", 1), Phase::new("b", u64::MAX / 4)], 2)
            .with_long_cycle(1, "b", u64::MAX / 2);
        engine.start(technique).unwrap();
        engine.tick().unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.phase_name.as_deref(), Some("b"));
        assert!(snap.progress_pct >= 0.0 && snap.progress_pct <= 100.0);
    }

    #[test]
    fn catch_up_replays_missed_seconds() {
        let mut engine = SessionEngine::new();
        engine.start(box_breathing()).unwrap();
        engine.catch_up(10).unwrap();
        assert_eq!(engine.state().current_phase_index, 2);
        assert_eq!(engine.state().remaining_seconds, 2);

        engine.catch_up(1000).unwrap();
        assert_eq!(engine.status(), SessionStatus::Completed);
    }

    #[test]
    fn snapshot_reports_progress() {
        let mut engine = SessionEngine::new();
        let idle = engine.snapshot();
        assert_eq!(idle.status, SessionStatus::Idle);
        assert_eq!(idle.progress_pct, 0.0);

        engine.start(box_breathing()).unwrap();
        tick_n(&mut engine, 16);
        let snap = engine.snapshot();
        assert_eq!(snap.completed_cycles, 1);
        assert_eq!(snap.phase_name.as_deref(), Some("inhale"));
        assert_eq!(snap.total_cycles, 2);
        assert!((snap.progress_pct - 50.0).abs() < f64::EPSILON);
    }
}
