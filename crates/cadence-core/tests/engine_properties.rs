//! Property tests for the session engine over random command sequences.

use cadence_core::{MemoryRecorder, Phase, SessionEngine, SessionState, SessionStatus, Technique};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Tick,
    Pause,
    Resume,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => Just(Op::Tick),
        1 => Just(Op::Pause),
        1 => Just(Op::Resume),
    ]
}

fn technique() -> impl Strategy<Value = Technique> {
    (
        prop::collection::vec(1u64..6, 1..5),
        1u32..5,
        prop::option::of((0u32..4, 1u64..9)),
    )
        .prop_map(|(durations, cycles, long)| {
            let phases = durations
                .iter()
                .enumerate()
                .map(|(i, d)| Phase::new(format!("p{i}"), *d))
                .collect();
            let technique = Technique::new("generated", "Generated", phases, cycles);
            match long {
                Some((every, secs)) => technique.with_long_cycle(every, "p0", secs),
                None => technique,
            }
        })
}

fn apply(engine: &mut SessionEngine, op: Op) -> bool {
    let result = match op {
        Op::Tick => engine.tick(),
        Op::Pause => engine.pause(),
        Op::Resume => engine.resume(),
    };
    result.is_ok()
}

proptest! {
    #[test]
    fn session_terminates_after_total_cycles(
        durations in prop::collection::vec(1u64..6, 1..5),
        cycles in 1u32..6,
    ) {
        let phases = durations.iter().enumerate().map(|(i, d)| Phase::new(format!("p{i}"), *d)).collect();
        let technique = Technique::new("t", "T", phases, cycles);
        let expected_ticks = technique.cycle_duration_secs() * u64::from(cycles);

        let mut engine = SessionEngine::new();
        engine.start(technique).unwrap();
        let mut ticks = 0u64;
        while engine.status() == SessionStatus::Running {
            engine.tick().unwrap();
            ticks += 1;
            prop_assert!(ticks <= expected_ticks);
        }

        prop_assert_eq!(engine.status(), SessionStatus::Completed);
        prop_assert_eq!(ticks, expected_ticks);
        prop_assert_eq!(engine.state().completed_cycles, cycles);
    }

    #[test]
    fn remaining_never_exceeds_phase_duration(
        technique in technique(),
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut engine = SessionEngine::new();
        engine.start(technique).unwrap();
        for op in ops {
            apply(&mut engine, op);
            let state = engine.state();
            prop_assert!(state.remaining_seconds <= state.phase_duration_seconds);
            if let Some(technique) = state.active_technique.as_ref() {
                prop_assert!(state.current_phase_index < technique.phases.len());
                prop_assert!(state.completed_cycles <= technique.total_cycles);
            }
        }
    }

    #[test]
    fn rejected_commands_leave_state_untouched(
        technique in technique(),
        ops in prop::collection::vec(op(), 0..120),
    ) {
        let mut engine = SessionEngine::new();
        engine.start(technique).unwrap();
        for op in ops {
            let before = engine.state().clone();
            if !apply(&mut engine, op) {
                prop_assert_eq!(engine.state(), &before);
            }
        }
    }

    #[test]
    fn reset_always_returns_to_idle(
        technique in technique(),
        ops in prop::collection::vec(op(), 0..120),
    ) {
        let mut engine = SessionEngine::new();
        engine.start(technique).unwrap();
        for op in ops {
            apply(&mut engine, op);
        }
        engine.reset();
        prop_assert_eq!(engine.state(), &SessionState::default());
        engine.reset();
        prop_assert_eq!(engine.state(), &SessionState::default());
    }

    #[test]
    fn catch_up_matches_repeated_ticks(
        technique in technique(),
        seconds in 0u64..150,
    ) {
        let mut ticked = SessionEngine::new();
        ticked.start(technique.clone()).unwrap();
        for _ in 0..seconds {
            if ticked.status() != SessionStatus::Running {
                break;
            }
            ticked.tick().unwrap();
        }

        let mut caught_up = SessionEngine::new();
        caught_up.start(technique).unwrap();
        caught_up.catch_up(seconds).unwrap();

        let (a, b) = (ticked.state(), caught_up.state());
        prop_assert_eq!(a.status, b.status);
        prop_assert_eq!(a.current_phase_index, b.current_phase_index);
        prop_assert_eq!(a.remaining_seconds, b.remaining_seconds);
        prop_assert_eq!(a.phase_duration_seconds, b.phase_duration_seconds);
        prop_assert_eq!(a.completed_cycles, b.completed_cycles);
        prop_assert_eq!(a.active_segment_elapsed, b.active_segment_elapsed);
    }

    #[test]
    fn every_counted_second_is_recorded_once(
        technique in technique(),
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let recorder = MemoryRecorder::new();
        let mut engine = SessionEngine::with_recorder(recorder.clone()).unwrap();
        engine.start(technique).unwrap();

        let mut counted = 0u64;
        for op in ops {
            if apply(&mut engine, op) && matches!(op, Op::Tick) {
                counted += 1;
            }
        }

        let pending = engine.state().active_segment_elapsed;
        prop_assert!(engine.shutdown_recorder().is_empty());
        prop_assert_eq!(recorder.total_seconds() + pending, counted);
        prop_assert!(recorder.segments().iter().all(|s| s.duration_seconds > 0));
    }
}
