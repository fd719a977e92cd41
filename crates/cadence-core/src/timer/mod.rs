mod cycle;
mod engine;
mod sequencer;
mod technique;

pub use cycle::{on_cycle_wrap, resolve_phase_duration, CycleWrap};
pub use engine::{SessionEngine, SessionSnapshot, SessionState, SessionStatus};
pub use sequencer::{next_index, wraps};
pub use technique::{LongCycleRule, Phase, Technique};
