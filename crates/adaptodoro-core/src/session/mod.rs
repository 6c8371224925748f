mod engine;
mod schedule;

pub use engine::{format_remaining, BreakAction, Phase, SessionEngine};
pub use schedule::{EscalationSchedule, DEFAULT_CUTOFF_MINUTES, DEFAULT_STAGE_MINUTES};
