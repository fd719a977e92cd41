//! Technique catalog.
//!
//! Built-in breathing exercises and Pomodoro, optionally adjusted and
//! extended from the user's configuration.

use tracing::warn;

use crate::storage::{Config, PomodoroConfig};
use crate::timer::{Phase, Technique};

pub const POMODORO_KEY: &str = "pomodoro";

#[derive(Debug, Clone)]
pub struct TechniqueCatalog {
    techniques: Vec<Technique>,
}

impl TechniqueCatalog {
    /// The techniques that ship with Cadence.
    pub fn builtin() -> Self {
        Self {
            techniques: vec![
                Technique::new(
                    "4-7-8",
                    "4-7-8 Breathing",
                    vec![
                        Phase::new("inhale", 4).with_instruction("Inhale through your nose"),
                        Phase::new("hold", 7).with_instruction("Hold your breath"),
                        Phase::new("exhale", 8).with_instruction("Exhale slowly through your mouth"),
                    ],
                    5,
                ),
                Technique::new(
                    "box",
                    "Box Breathing",
                    vec![
                        Phase::new("inhale", 4).with_instruction("Inhale through your nose"),
                        Phase::new("hold", 4).with_instruction("Hold your breath"),
                        Phase::new("exhale", 4).with_instruction("Exhale through your mouth"),
                        Phase::new("holdAfterExhale", 4).with_instruction("Hold again before repeating"),
                    ],
                    8,
                ),
                Technique::new(
                    "deep",
                    "Deep Breathing",
                    vec![
                        Phase::new("inhale", 5).with_instruction("Inhale slowly through your nose into your belly"),
                        Phase::new("exhale", 6).with_instruction("Exhale fully through your mouth"),
                    ],
                    30,
                ),
                Technique::new(
                    "calming",
                    "Calming Breathing",
                    vec![
                        Phase::new("inhale", 4).with_instruction("Breathe in slowly and deeply through your nose"),
                        Phase::new("exhale", 8).with_instruction("Exhale even slower, letting go of tension"),
                    ],
                    20,
                ),
                pomodoro(&PomodoroConfig::default()),
            ],
        }
    }

    /// Built-ins with configured Pomodoro durations, plus user techniques.
    ///
    /// A user technique that fails validation or reuses an existing key is
    /// skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut catalog = Self::builtin();
        if let Some(slot) = catalog.techniques.iter_mut().find(|t| t.key == POMODORO_KEY) {
            *slot = pomodoro(&config.pomodoro);
        }

        for technique in &config.techniques {
            if catalog.get(&technique.key).is_some() {
                warn!(key = %technique.key, "duplicate technique key in config; skipped");
                continue;
            }
            if let Err(err) = technique.validate() {
                warn!(key = %technique.key, error = %err, "invalid technique in config; skipped");
                continue;
            }
            catalog.techniques.push(technique.clone());
        }
        catalog
    }

    pub fn get(&self, key: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technique> {
        self.techniques.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.techniques.iter().map(|t| t.key.as_str()).collect()
    }
}

impl Default for TechniqueCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Work/break Pomodoro with a long break every `cycles_before_long_break`.
pub fn pomodoro(config: &PomodoroConfig) -> Technique {
    Technique::new(
        POMODORO_KEY,
        "Pomodoro",
        vec![
            Phase::new("work", config.work_minutes.saturating_mul(60)).with_instruction("Focus on one task"),
            Phase::new("break", config.short_break_minutes.saturating_mul(60)).with_instruction("Step away and rest"),
        ],
        config.total_cycles,
    )
    .with_long_cycle(
        config.cycles_before_long_break,
        "break",
        config.long_break_minutes.saturating_mul(60),
    )
}
