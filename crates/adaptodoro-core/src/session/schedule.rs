use serde::{Deserialize, Serialize};

/// Stage lengths of the default escalation, in minutes.
pub const DEFAULT_STAGE_MINUTES: [u64; 6] = [5, 6, 8, 10, 12, 15];

/// Elapsed minutes after which a session is considered fully done.
pub const DEFAULT_CUTOFF_MINUTES: u64 = 56;

/// Escalating stage durations for a single session.
///
/// Stage `n` lasts `stage_minutes[n]`; stages past the end reuse the last
/// entry. The cutoff is measured from the session's original start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationSchedule {
    stage_minutes: Vec<u64>,
    cutoff_minutes: u64,
}

impl EscalationSchedule {
    /// Build a schedule. Returns `None` if it has no stages, a zero-length
    /// stage or a zero cutoff.
    pub fn new(stage_minutes: Vec<u64>, cutoff_minutes: u64) -> Option<Self> {
        if stage_minutes.is_empty() || stage_minutes.contains(&0) || cutoff_minutes == 0 {
            return None;
        }
        Some(Self {
            stage_minutes,
            cutoff_minutes,
        })
    }

    pub fn stage_minutes(&self) -> &[u64] {
        &self.stage_minutes
    }

    pub fn cutoff_minutes(&self) -> u64 {
        self.cutoff_minutes
    }

    pub fn len(&self) -> usize {
        self.stage_minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage_minutes.is_empty()
    }

    /// Schedule index for the given number of completed stages.
    pub fn index_for(&self, session_count: u32) -> usize {
        (session_count as usize).min(self.stage_minutes.len().saturating_sub(1))
    }

    /// Stage length in minutes, clamped to the last entry.
    pub fn minutes_at(&self, index: usize) -> u64 {
        let last = self.stage_minutes.len().saturating_sub(1);
        self.stage_minutes
            .get(index.min(last))
            .copied()
            .unwrap_or(0)
    }

    /// Stage length in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn secs_at(&self, index: usize) -> u64 {
        self.minutes_at(index).saturating_mul(60)
    }

    pub fn total_minutes(&self) -> u64 {
        self.stage_minutes.iter().sum()
    }
}

impl Default for EscalationSchedule {
    fn default() -> Self {
        Self {
            stage_minutes: DEFAULT_STAGE_MINUTES.to_vec(),
            cutoff_minutes: DEFAULT_CUTOFF_MINUTES,
        }
    }
}
