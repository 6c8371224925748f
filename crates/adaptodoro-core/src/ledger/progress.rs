//! Cumulative rewards and the history of recorded tasks.
//!
//! The ledger is the only durable state. `level` is never stored on its own;
//! it is always derived from `total_exp`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Experience needed per level.
pub const EXP_PER_LEVEL: u64 = 100;

/// Result text stored when the user leaves it blank.
pub const DEFAULT_RESULT: &str = "Task complete";

/// `ceil(actual_minutes * 1.5)`, in integer arithmetic.
pub fn exp_for_minutes(actual_minutes: u64) -> u64 {
    actual_minutes.saturating_mul(3).div_ceil(2)
}

pub fn level_for_exp(total_exp: u64) -> u64 {
    total_exp / EXP_PER_LEVEL + 1
}

/// One recorded task, in the on-disk shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub reason: String,
    pub result: String,
    /// Kept as written so restored snapshots re-serialize unchanged.
    #[serde(rename = "datetime")]
    pub recorded_at: String,
    #[serde(rename = "plannedDuration")]
    pub planned_minutes: u64,
    #[serde(rename = "actualDuration")]
    pub actual_minutes: u64,
    #[serde(rename = "expGained")]
    pub exp_gained: u64,
}

impl HistoryEntry {
    /// Parsed timestamp, if the stored string is RFC 3339.
    pub fn recorded_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.recorded_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Read-only summary for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub level: u64,
    pub total_exp: u64,
    pub exp_into_level: u64,
    pub exp_to_next_level: u64,
    pub total_work_minutes: u64,
    pub tasks_recorded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLedger {
    history: Vec<HistoryEntry>,
    total_work_minutes: u64,
    total_exp: u64,
    default_result: String,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), 0, 0)
    }

    pub(crate) fn from_parts(history: Vec<HistoryEntry>, total_work_minutes: u64, total_exp: u64) -> Self {
        Self {
            history,
            total_work_minutes,
            total_exp,
            default_result: DEFAULT_RESULT.to_string(),
        }
    }

    /// Use a different placeholder for blank results.
    pub fn with_default_result(mut self, text: impl Into<String>) -> Self {
        self.default_result = text.into();
        self
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn total_work_minutes(&self) -> u64 {
        self.total_work_minutes
    }

    pub fn total_exp(&self) -> u64 {
        self.total_exp
    }

    pub fn level(&self) -> u64 {
        level_for_exp(self.total_exp)
    }

    pub fn exp_into_level(&self) -> u64 {
        self.total_exp % EXP_PER_LEVEL
    }

    pub fn exp_to_next_level(&self) -> u64 {
        EXP_PER_LEVEL - self.exp_into_level()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.total_work_minutes == 0 && self.total_exp == 0
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            level: self.level(),
            total_exp: self.total_exp,
            exp_into_level: self.exp_into_level(),
            exp_to_next_level: self.exp_to_next_level(),
            total_work_minutes: self.total_work_minutes,
            tasks_recorded: self.history.len(),
        }
    }

    /// Credit a finished task and append it to the history.
    ///
    /// `actual_minutes` is raised to 1 if lower. A blank result is replaced
    /// by the default placeholder.
    pub fn record_completion(
        &mut self,
        reason: &str,
        result_text: &str,
        planned_minutes: u64,
        actual_minutes: u64,
        at: DateTime<Utc>,
    ) -> &HistoryEntry {
        let actual_minutes = actual_minutes.max(1);
        let exp_gained = exp_for_minutes(actual_minutes);
        let result = match result_text.trim() {
            "" => self.default_result.clone(),
            text => text.to_string(),
        };

        self.total_work_minutes = self.total_work_minutes.saturating_add(actual_minutes);
        self.total_exp = self.total_exp.saturating_add(exp_gained);
        self.history.push(HistoryEntry {
            reason: reason.to_string(),
            result,
            recorded_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            planned_minutes,
            actual_minutes,
            exp_gained,
        });
        tracing::info!(
            actual_minutes,
            exp_gained,
            level = self.level(),
            "task recorded"
        );
        &self.history[self.history.len() - 1]
    }

    /// Wipe history and totals. There is no undo.
    pub fn reset_all(&mut self) {
        self.history.clear();
        self.total_work_minutes = 0;
        self.total_exp = 0;
        tracing::info!("ledger reset");
    }
}

impl Default for ProgressLedger {
    fn default() -> Self {
        Self::new()
    }
}
