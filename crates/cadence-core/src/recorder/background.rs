use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CompletedSegment, SessionRecorder};
use crate::error::RecordingFailed;

/// Delivers segments to a recorder on a dedicated worker thread.
///
/// Submitting never blocks: segments go onto an unbounded channel and the
/// worker drains it at its own pace. Failures come back on a second channel
/// and are collected with [`BackgroundRecorder::drain_failures`].
pub struct BackgroundRecorder {
    tx: Option<mpsc::UnboundedSender<CompletedSegment>>,
    failures: mpsc::UnboundedReceiver<RecordingFailed>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundRecorder {
    /// Move `recorder` onto a new worker thread.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<R>(mut recorder: R) -> std::io::Result<Self>
    where
        R: SessionRecorder + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<CompletedSegment>();
        let (failure_tx, failures) = mpsc::unbounded_channel();

        let worker = std::thread::Builder::new()
            .name("cadence-recorder".into())
            .spawn(move || {
                while let Some(segment) = rx.blocking_recv() {
                    match recorder.record(&segment) {
                        Ok(()) => debug!(
                            phase = %segment.phase_name,
                            secs = segment.duration_seconds,
                            "segment recorded"
                        ),
                        Err(failure) => {
                            warn!(error = %failure, "segment not recorded");
                            // The engine may already be gone; nothing left to notify.
                            let _ = failure_tx.send(failure);
                        }
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            failures,
            worker: Some(worker),
        })
    }

    /// Queue a segment for the worker.
    pub fn submit(&self, segment: CompletedSegment) -> Result<(), RecordingFailed> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(RecordingFailed::new(&segment.phase_name, "recorder has shut down"));
        };
        tx.send(segment)
            .map_err(|err| RecordingFailed::new(&err.0.phase_name, "recorder worker has stopped"))
    }

    /// Failures reported by the worker since the last call.
    pub fn drain_failures(&mut self) -> Vec<RecordingFailed> {
        let mut drained = Vec::new();
        while let Ok(failure) = self.failures.try_recv() {
            drained.push(failure);
        }
        drained
    }

    /// Close the queue, wait for the worker to record what is left, and
    /// return the failures it reported.
    pub fn shutdown(mut self) -> Vec<RecordingFailed> {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("recorder worker panicked");
            }
        }
        self.drain_failures()
    }
}

impl Drop for BackgroundRecorder {
    fn drop(&mut self) {
        // Closing the sender lets a detached worker finish its queue and exit.
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::MemoryRecorder;
    use chrono::Utc;
    use uuid::Uuid;

    fn segment(name: &str, secs: u64) -> CompletedSegment {
        CompletedSegment {
            session_id: Uuid::new_v4(),
            technique: "pomodoro".into(),
            phase_name: name.into(),
            started_at: Utc::now(),
            duration_seconds: secs,
        }
    }

    #[test]
    fn shutdown_flushes_queued_segments() {
        let memory = MemoryRecorder::new();
        let worker = BackgroundRecorder::spawn(memory.clone()).unwrap();
        worker.submit(segment("work", 1500)).unwrap();
        worker.submit(segment("break", 300)).unwrap();
        let failures = worker.shutdown();
        assert!(failures.is_empty());
        assert_eq!(memory.total_seconds(), 1800);
    }

    #[test]
    fn failures_come_back_on_shutdown() {
        let worker = BackgroundRecorder::spawn(|s: &CompletedSegment| {
            Err::<(), _>(RecordingFailed::new(&s.phase_name, "store unreachable"))
        })
        .unwrap();
        worker.submit(segment("work", 10)).unwrap();
        worker.submit(segment("break", 5)).unwrap();
        let failures = worker.shutdown();
        assert_eq!(
            failures,
            vec![
                RecordingFailed::new("work", "store unreachable"),
                RecordingFailed::new("break", "store unreachable"),
            ]
        );
    }
}
