use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A named, timed segment of a technique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub duration_seconds: u64,
    /// Cue shown to the user while the phase runs.
    #[serde(default)]
    pub instruction: String,
}

impl Phase {
    pub fn new(name: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
            instruction: String::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }
}

/// Lengthens one phase every `every` repetitions (Pomodoro's long break).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongCycleRule {
    /// Repetition interval. Zero disables the rule.
    pub every: u32,
    /// Name of the phase that gets the long variant.
    pub phase: String,
    pub duration_seconds: u64,
}

/// An ordered sequence of phases plus cycle-repetition rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub key: String,
    pub name: String,
    pub phases: Vec<Phase>,
    pub total_cycles: u32,
    #[serde(default)]
    pub long_cycle: Option<LongCycleRule>,
}

impl Technique {
    pub fn new(key: impl Into<String>, name: impl Into<String>, phases: Vec<Phase>, total_cycles: u32) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            phases,
            total_cycles,
            long_cycle: None,
        }
    }

    pub fn with_long_cycle(mut self, every: u32, phase: impl Into<String>, duration_seconds: u64) -> Self {
        self.long_cycle = Some(LongCycleRule {
            every,
            phase: phase.into(),
            duration_seconds,
        });
        self
    }

    /// Reject techniques the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.phases.is_empty() {
            return Err(ConfigurationError::EmptyPhases {
                technique: self.key.clone(),
            });
        }
        if self.total_cycles == 0 {
            return Err(ConfigurationError::NonPositiveCycles {
                technique: self.key.clone(),
            });
        }
        if let Some(phase) = self.phases.iter().find(|p| p.duration_seconds == 0) {
            return Err(ConfigurationError::NonPositiveDuration {
                technique: self.key.clone(),
                phase: phase.name.clone(),
            });
        }
        if let Some(rule) = self.active_long_cycle() {
            if self.long_phase_index().is_none() {
                return Err(ConfigurationError::UnknownLongCyclePhase {
                    technique: self.key.clone(),
                    phase: rule.phase.clone(),
                });
            }
            if rule.duration_seconds == 0 {
                return Err(ConfigurationError::NonPositiveLongDuration {
                    technique: self.key.clone(),
                });
            }
        }
        if self.longest_cycle_secs().is_none() {
            return Err(ConfigurationError::CycleTooLong {
                technique: self.key.clone(),
            });
        }
        Ok(())
    }

    /// Length of the longest pass, counting the long-cycle override.
    /// `None` if it does not fit in a `u64`.
    pub fn longest_cycle_secs(&self) -> Option<u64> {
        let regular = self
            .phases
            .iter()
            .try_fold(0u64, |total, p| total.checked_add(p.duration_seconds))?;
        let (Some(rule), Some(index)) = (self.active_long_cycle(), self.long_phase_index()) else {
            return Some(regular);
        };
        let long = (regular - self.phases[index].duration_seconds).checked_add(rule.duration_seconds)?;
        Some(regular.max(long))
    }

    /// The long-cycle rule, if one is set and enabled.
    pub fn active_long_cycle(&self) -> Option<&LongCycleRule> {
        self.long_cycle.as_ref().filter(|rule| rule.every > 0)
    }

    /// Index of the phase the long-cycle rule applies to.
    pub fn long_phase_index(&self) -> Option<usize> {
        let rule = self.long_cycle.as_ref()?;
        self.phases.iter().position(|p| p.name == rule.phase)
    }

    /// Length of one regular pass through all phases.
    pub fn cycle_duration_secs(&self) -> u64 {
        self.cumulative_secs(self.phases.len())
    }

    /// Seconds of all phases before `phase_index` within one cycle.
    pub fn cumulative_secs(&self, phase_index: usize) -> u64 {
        self.phases
            .iter()
            .take(phase_index)
            .fold(0u64, |total, p| total.saturating_add(p.duration_seconds))
    }
}
