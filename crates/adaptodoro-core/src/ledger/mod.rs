mod progress;
pub mod snapshot;

pub use progress::{
    exp_for_minutes, level_for_exp, HistoryEntry, LedgerStats, ProgressLedger, DEFAULT_RESULT,
    EXP_PER_LEVEL,
};
pub use snapshot::{LedgerSnapshot, Restored};
