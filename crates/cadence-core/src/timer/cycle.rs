//! Cycle counting and long-cycle duration resolution.

use super::technique::Technique;

/// Result of a wrap from the last phase back to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleWrap {
    pub completed_cycles: u32,
    /// No further phases are issued once this is set.
    pub finished: bool,
}

pub fn on_cycle_wrap(completed_cycles: u32, total_cycles: u32) -> CycleWrap {
    let completed_cycles = completed_cycles.saturating_add(1);
    CycleWrap {
        completed_cycles,
        finished: completed_cycles >= total_cycles,
    }
}

/// Duration of the phase at `phase_index`, given the cycles completed so far.
///
/// The long variant applies when the number of repetitions leading into the
/// long-cycle phase is a positive multiple of the rule's interval. For a
/// phase that follows another one in the same cycle (a break after work),
/// its predecessor has already finished once more than `completed_cycles`
/// records.
pub fn resolve_phase_duration(technique: &Technique, phase_index: usize, completed_cycles: u32) -> u64 {
    let Some(phase) = technique.phases.get(phase_index) else {
        return 0;
    };

    let Some(rule) = technique.active_long_cycle() else {
        return phase.duration_seconds;
    };
    if technique.long_phase_index() != Some(phase_index) {
        return phase.duration_seconds;
    }

    let repetitions = if phase_index > 0 {
        completed_cycles.saturating_add(1)
    } else {
        completed_cycles
    };

    if repetitions > 0 && repetitions % rule.every == 0 {
        rule.duration_seconds
    } else {
        phase.duration_seconds
    }
}
