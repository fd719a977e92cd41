//! Host scheduler for the session engine.
//!
//! Ticks a [`SessionEngine`] once per period on a tokio interval while the
//! session runs, and applies pause/resume/stop requests arriving on a
//! channel. The engine itself never touches a timer.
//!
//! Missed ticks are delivered in a burst when the task gets to run again, so
//! a host that was starved for a few seconds catches up instead of drifting.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::events::Event;
use crate::timer::{SessionEngine, SessionStatus};

/// Requests a host can send to a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct IntervalScheduler {
    period: Duration,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drive `engine` until the session completes or is stopped.
    ///
    /// The engine must already be started. Returns the final status:
    /// `Completed` after the last cycle, `Idle` after a stop. If the control
    /// channel closes while the session is paused, returns `Paused`.
    pub async fn run<F>(
        &self,
        engine: &mut SessionEngine,
        mut control: mpsc::UnboundedReceiver<Control>,
        mut on_event: F,
    ) -> SessionStatus
    where
        F: FnMut(&Event),
    {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        // The first tick completes immediately.
        interval.tick().await;

        let mut control_open = true;
        loop {
            match engine.status() {
                SessionStatus::Running => {}
                SessionStatus::Paused if control_open => {}
                status => return status,
            }

            tokio::select! {
                _ = interval.tick(), if engine.status() == SessionStatus::Running => {
                    emit(engine.tick(), &mut on_event);
                }
                message = control.recv(), if control_open => match message {
                    Some(Control::Pause) => {
                        emit(engine.pause(), &mut on_event);
                    }
                    Some(Control::Resume) => {
                        if emit(engine.resume(), &mut on_event) {
                            // Count the first resumed second from now.
                            interval.reset();
                        }
                    }
                    Some(Control::Stop) => {
                        engine.stop().iter().for_each(&mut on_event);
                        return engine.status();
                    }
                    None => {
                        debug!("control channel closed");
                        control_open = false;
                    }
                },
            }
        }
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::every_second()
    }
}

/// Forward the events of an engine command. Returns whether it was applied.
fn emit<F>(result: Result<Vec<Event>, EngineError>, on_event: &mut F) -> bool
where
    F: FnMut(&Event),
{
    match result {
        Ok(events) => {
            events.iter().for_each(on_event);
            true
        }
        Err(err) => {
            warn!(error = %err, "scheduler command ignored");
            false
        }
    }
}
