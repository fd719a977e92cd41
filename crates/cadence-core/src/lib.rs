//! # Cadence Core Library
//!
//! This library provides the core logic for Cadence, an interval timer for
//! breathing exercises and Pomodoro sessions. Every operation is available
//! through the standalone `cadence` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Engine**: A tick-driven state machine; the host calls `tick()`
//!   once per elapsed second
//! - **Recorder**: Best-effort hand-off of completed segments to a sink
//!   on a background worker
//! - **Scheduler**: A tokio interval that drives the engine and applies
//!   pause/resume/stop requests
//! - **Storage**: SQLite segment storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Technique`]: Phases plus cycle-repetition rules
//! - [`TechniqueCatalog`]: Built-in and user-defined techniques
//! - [`SessionRecorder`]: Trait for segment persistence
//! - [`Database`]: Segment persistence and statistics
//! - [`Config`]: Application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod recorder;
pub mod scheduler;
pub mod storage;
pub mod timer;

pub use catalog::TechniqueCatalog;
pub use error::{
    Action, ConfigError, ConfigurationError, CoreError, DatabaseError, EngineError, RecordingFailed,
};
pub use events::Event;
pub use recorder::{BackgroundRecorder, CompletedSegment, MemoryRecorder, SessionRecorder};
pub use scheduler::{Control, IntervalScheduler};
pub use storage::{Config, Database, Stats};
pub use timer::{
    LongCycleRule, Phase, SessionEngine, SessionSnapshot, SessionState, SessionStatus, Technique,
};
