mod config;
pub mod database;

pub use config::{Config, EngineConfig, PomodoroConfig};
pub use database::{Database, SegmentRecord, Stats, TechniqueStats};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `CADENCE_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/cadence[-dev]/`, with `CADENCE_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CADENCE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CADENCE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("cadence-dev")
            } else {
                base_dir.join("cadence")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
