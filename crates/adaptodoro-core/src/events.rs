use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Phase;

/// Every state change in the session engine produces an Event.
/// The presentation layer re-reads state after each one; the application
/// root forwards `TaskRecorded` into the progress ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The first stage started and the reason prompt was opened.
    SessionStarted {
        stage_index: usize,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ReasonSubmitted {
        reason: String,
        at: DateTime<Utc>,
    },
    /// The countdown of a stage reached zero.
    StageExpired {
        stage_index: usize,
        session_count: u32,
        at: DateTime<Utc>,
    },
    /// The user chose to go on; the next (longer) stage is running.
    StageContinued {
        stage_index: usize,
        session_count: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// The cutoff elapsed; the session is done and only a reset remains.
    SessionCompleted {
        session_count: u32,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// The task ended (early or by stopping) and awaits its result text.
    TaskEndRequested {
        early: bool,
        at: DateTime<Utc>,
    },
    /// Not even the first stage was completed; suggest splitting the task.
    BreakSuggested {
        at: DateTime<Utc>,
    },
    BreakRetried {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TaskAbandoned {
        reason: String,
        at: DateTime<Utc>,
    },
    /// A finished task, ready to be credited to the ledger.
    TaskRecorded {
        reason: String,
        result: String,
        planned_minutes: u64,
        actual_minutes: u64,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    LedgerReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        awaiting_reason: bool,
        finished_naturally: bool,
        stage_index: usize,
        stage_minutes: u64,
        session_count: u32,
        seconds_remaining: u64,
        remaining_display: String,
        task_reason: String,
        started_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Wire name of the variant, as written in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "SessionStarted",
            Event::ReasonSubmitted { .. } => "ReasonSubmitted",
            Event::StageExpired { .. } => "StageExpired",
            Event::StageContinued { .. } => "StageContinued",
            Event::SessionCompleted { .. } => "SessionCompleted",
            Event::TaskEndRequested { .. } => "TaskEndRequested",
            Event::BreakSuggested { .. } => "BreakSuggested",
            Event::BreakRetried { .. } => "BreakRetried",
            Event::TaskAbandoned { .. } => "TaskAbandoned",
            Event::TaskRecorded { .. } => "TaskRecorded",
            Event::SessionReset { .. } => "SessionReset",
            Event::LedgerReset { .. } => "LedgerReset",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}
