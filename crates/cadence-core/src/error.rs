//! Core error types for cadence-core.
//!
//! Every failure the engine can report is a value: invalid lifecycle
//! transitions, rejected techniques, and recorder failures never unwind
//! through a half-applied tick.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::SessionStatus;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Engine lifecycle errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A technique key that is not in the catalog
    #[error("Unknown technique: {0}")]
    UnknownTechnique(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The engine command that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Resume,
    Tick,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Tick => "tick",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`crate::SessionEngine`] commands.
///
/// Both variants leave the session state exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot {action} while {status:?}")]
    InvalidTransition {
        action: Action,
        status: SessionStatus,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A technique that cannot be run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("technique '{technique}' has no phases")]
    EmptyPhases { technique: String },

    #[error("technique '{technique}' must run at least one cycle")]
    NonPositiveCycles { technique: String },

    #[error("phase '{phase}' of technique '{technique}' has a zero duration")]
    NonPositiveDuration { technique: String, phase: String },

    #[error("long-cycle rule of technique '{technique}' names unknown phase '{phase}'")]
    UnknownLongCyclePhase { technique: String, phase: String },

    #[error("long-cycle rule of technique '{technique}' has a zero duration")]
    NonPositiveLongDuration { technique: String },

    #[error("one cycle of technique '{technique}' is too long to count")]
    CycleTooLong { technique: String },
}

/// A segment the recorder sink could not persist. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to record segment '{phase_name}': {reason}")]
pub struct RecordingFailed {
    pub phase_name: String,
    pub reason: String,
}

impl RecordingFailed {
    pub fn new(phase_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            phase_name: phase_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Could not resolve the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Key does not exist in the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) if e.code == rusqlite::ErrorCode::DatabaseLocked => {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
