//! Session engine implementation.
//!
//! The session engine is a tick-driven state machine. It does not use
//! internal threads or read the wall clock - the caller delivers `tick()`
//! once per second while the phase is `Working` and passes `now` into every
//! time-dependent command.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Working -> ContinueCheck -> Working ...      (continue)
//!                                  -> Completed -> Idle (cutoff reached, reset)
//!                                  -> BreakSuggestion -> Working | Idle
//!                                  -> TaskComplete -> Idle
//!         Working -> TaskComplete -> Idle                (complete early)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(EscalationSchedule::default());
//! engine.start_work(Utc::now());
//! // Once per second:
//! engine.tick(1, Utc::now()); // Returns Some(Event::StageExpired) at zero
//! ```

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::EscalationSchedule;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// A stage countdown is running.
    Working,
    /// The countdown reached zero; continue or stop?
    ContinueCheck,
    /// The task is over and waits for its result text.
    TaskComplete,
    /// The first stage was not even finished; offer a retry.
    BreakSuggestion,
    /// The cutoff was reached. Terminal until `reset()`.
    Completed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Working => "working",
            Phase::ContinueCheck => "continue-check",
            Phase::TaskComplete => "task-complete",
            Phase::BreakSuggestion => "break-suggestion",
            Phase::Completed => "completed",
        }
    }

    /// Whether the host should be delivering ticks.
    pub fn is_counting(&self) -> bool {
        matches!(self, Phase::Working)
    }
}

/// What to do after failing the first stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakAction {
    Retry,
    Abandon,
}

impl FromStr for BreakAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retry" | "r" => Ok(BreakAction::Retry),
            "abandon" | "a" => Ok(BreakAction::Abandon),
            other => Err(format!("unknown break action: {other}")),
        }
    }
}

/// Core session engine.
///
/// Holds at most one session. Every command returns `Some(Event)` when it
/// changed state and `None` when it was a no-op in the current phase.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    schedule: EscalationSchedule,
    phase: Phase,
    /// Index into the escalation schedule for the running stage.
    stage_index: usize,
    /// Stages completed by continuing. Drives `stage_index`.
    session_count: u32,
    seconds_remaining: u64,
    task_reason: String,
    /// Start of the session's first stage. Not moved by `continue`.
    started_at: Option<DateTime<Utc>>,
    /// The reason prompt opened by `start_work` is still unanswered.
    awaiting_reason: bool,
    /// The last stage ran out rather than being ended by the user.
    finished_naturally: bool,
}

impl SessionEngine {
    /// Create an idle engine using the given schedule.
    pub fn new(schedule: EscalationSchedule) -> Self {
        Self {
            schedule,
            phase: Phase::Idle,
            stage_index: 0,
            session_count: 0,
            seconds_remaining: 0,
            task_reason: String::new(),
            started_at: None,
            awaiting_reason: false,
            finished_naturally: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn schedule(&self) -> &EscalationSchedule {
        &self.schedule
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    pub fn task_reason(&self) -> &str {
        &self.task_reason
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn awaiting_reason(&self) -> bool {
        self.awaiting_reason
    }

    pub fn finished_naturally(&self) -> bool {
        self.finished_naturally
    }

    /// Length of the current stage in minutes.
    pub fn stage_minutes(&self) -> u64 {
        self.schedule.minutes_at(self.stage_index)
    }

    /// Length of the stage a `continue` would start, in minutes.
    pub fn next_stage_minutes(&self) -> u64 {
        self.schedule
            .minutes_at(self.schedule.index_for(self.session_count.saturating_add(1)))
    }

    /// Seconds since the session started, or 0 without a session.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|start| (now - start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Whole minutes worked, rounded up, never below 1.
    pub fn elapsed_minutes_ceil(&self, now: DateTime<Utc>) -> u64 {
        let ms = self
            .started_at
            .map(|start| (now - start).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        ms.div_ceil(60_000).max(1)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            awaiting_reason: self.awaiting_reason,
            finished_naturally: self.finished_naturally,
            stage_index: self.stage_index,
            stage_minutes: self.stage_minutes(),
            session_count: self.session_count,
            seconds_remaining: self.seconds_remaining,
            remaining_display: format_remaining(self.seconds_remaining),
            task_reason: self.task_reason.clone(),
            started_at: self.started_at,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the first five-minute stage and open the reason prompt.
    pub fn start_work(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::Idle {
            return None;
        }
        self.clear_session();
        self.started_at = Some(now);
        self.awaiting_reason = true;
        self.enter_stage(0);
        tracing::debug!(duration_secs = self.seconds_remaining, "session started");
        Some(Event::SessionStarted {
            stage_index: self.stage_index,
            duration_secs: self.seconds_remaining,
            at: now,
        })
    }

    /// Answer the reason prompt. The countdown keeps running meanwhile.
    ///
    /// Whitespace is trimmed; an empty reason is accepted as-is.
    pub fn submit_reason(&mut self, text: &str, now: DateTime<Utc>) -> Option<Event> {
        if !self.awaiting_reason || self.phase == Phase::Idle {
            return None;
        }
        self.task_reason = text.trim().to_string();
        self.awaiting_reason = false;
        tracing::debug!(empty = self.task_reason.is_empty(), "reason submitted");
        Some(Event::ReasonSubmitted {
            reason: self.task_reason.clone(),
            at: now,
        })
    }

    /// End the task before the stage runs out.
    pub fn complete_early(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::Working {
            return None;
        }
        self.phase = Phase::TaskComplete;
        tracing::debug!(stage = self.stage_index, "task completed early");
        Some(Event::TaskEndRequested { early: true, at: now })
    }

    /// Count down by `delta_secs`. Returns `Some(Event::StageExpired)` when
    /// the stage reaches zero. No-op outside `Working`.
    pub fn tick(&mut self, delta_secs: u64, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::Working || delta_secs == 0 {
            return None;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(delta_secs);
        if self.seconds_remaining > 0 {
            return None;
        }
        self.phase = Phase::ContinueCheck;
        self.finished_naturally = true;
        tracing::debug!(stage = self.stage_index, "stage expired");
        Some(Event::StageExpired {
            stage_index: self.stage_index,
            session_count: self.session_count,
            at: now,
        })
    }

    /// Move on to the next, longer stage unless the cutoff has passed.
    pub fn continue_session(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::ContinueCheck {
            return None;
        }
        self.finished_naturally = false;
        self.session_count = self.session_count.saturating_add(1);

        let elapsed_secs = self.elapsed_secs(now);
        if elapsed_secs >= self.schedule.cutoff_minutes().saturating_mul(60) {
            self.phase = Phase::Completed;
            self.seconds_remaining = 0;
            tracing::debug!(elapsed_secs, "session cutoff reached");
            return Some(Event::SessionCompleted {
                session_count: self.session_count,
                elapsed_secs,
                at: now,
            });
        }

        self.enter_stage(self.schedule.index_for(self.session_count));
        tracing::debug!(stage = self.stage_index, elapsed_secs, "stage continued");
        Some(Event::StageContinued {
            stage_index: self.stage_index,
            session_count: self.session_count,
            duration_secs: self.seconds_remaining,
            at: now,
        })
    }

    /// Decline to continue. Failing the very first stage leads to the break
    /// suggestion instead of result capture.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::ContinueCheck {
            return None;
        }
        self.finished_naturally = false;
        if self.session_count == 0 {
            self.phase = Phase::BreakSuggestion;
            tracing::debug!("stopped on the first stage, suggesting a break");
            Some(Event::BreakSuggested { at: now })
        } else {
            self.phase = Phase::TaskComplete;
            tracing::debug!(session_count = self.session_count, "session stopped");
            Some(Event::TaskEndRequested { early: false, at: now })
        }
    }

    pub fn choose_break_action(&mut self, action: BreakAction, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::BreakSuggestion {
            return None;
        }
        match action {
            BreakAction::Retry => {
                self.enter_stage(0);
                tracing::debug!("retrying the first stage");
                Some(Event::BreakRetried {
                    duration_secs: self.seconds_remaining,
                    at: now,
                })
            }
            BreakAction::Abandon => {
                let reason = std::mem::take(&mut self.task_reason);
                self.clear_session();
                tracing::debug!("task abandoned");
                Some(Event::TaskAbandoned { reason, at: now })
            }
        }
    }

    /// Close the task with its result. The returned `TaskRecorded` event is
    /// what the ledger credits.
    pub fn record_completion(&mut self, result_text: &str, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != Phase::TaskComplete {
            return None;
        }
        let actual_minutes = self.elapsed_minutes_ceil(now);
        let planned_minutes = self.stage_minutes();
        let reason = std::mem::take(&mut self.task_reason);
        self.clear_session();
        tracing::debug!(planned_minutes, actual_minutes, "task closed");
        Some(Event::TaskRecorded {
            reason,
            result: result_text.trim().to_string(),
            planned_minutes,
            actual_minutes,
            at: now,
        })
    }

    /// Discard the session without recording anything.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase == Phase::Idle {
            return None;
        }
        let phase = self.phase.label();
        self.clear_session();
        tracing::debug!(phase, "session reset");
        Some(Event::SessionReset { at: now })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_stage(&mut self, index: usize) {
        self.stage_index = index;
        self.seconds_remaining = self.schedule.secs_at(index);
        self.finished_naturally = false;
        self.phase = Phase::Working;
    }

    fn clear_session(&mut self) {
        self.phase = Phase::Idle;
        self.stage_index = 0;
        self.session_count = 0;
        self.seconds_remaining = 0;
        self.task_reason.clear();
        self.started_at = None;
        self.awaiting_reason = false;
        self.finished_naturally = false;
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(EscalationSchedule::default())
    }
}

/// `m:ss` rendering of a countdown.
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn run_stage(engine: &mut SessionEngine, now: DateTime<Utc>) -> Option<Event> {
        let mut last = None;
        while engine.phase() == Phase::Working {
            last = engine.tick(1, now);
        }
        last
    }

    #[test]
    fn start_work_opens_first_stage() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        assert!(engine.start_work(now).is_some());
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.seconds_remaining(), 300);
        assert_eq!(engine.stage_index(), 0);
        assert!(engine.awaiting_reason());
        assert_eq!(engine.started_at(), Some(now));
    }

    #[test]
    fn start_work_is_noop_while_session_active() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        engine.tick(10, now);
        assert!(engine.start_work(now).is_none());
        assert_eq!(engine.seconds_remaining(), 290);
    }

    #[test]
    fn reason_is_trimmed_and_empty_accepted() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        assert!(engine.submit_reason("  write the report \n", now).is_some());
        assert_eq!(engine.task_reason(), "write the report");
        assert!(!engine.awaiting_reason());
        // Prompt is closed now.
        assert!(engine.submit_reason("other", now).is_none());

        let mut engine = SessionEngine::default();
        engine.start_work(now);
        assert!(engine.submit_reason("   ", now).is_some());
        assert_eq!(engine.task_reason(), "");
    }

    #[test]
    fn expiry_moves_to_continue_check() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        for _ in 0..299 {
            assert!(engine.tick(1, now).is_none());
        }
        assert!(matches!(engine.tick(1, now), Some(Event::StageExpired { .. })));
        assert_eq!(engine.phase(), Phase::ContinueCheck);
        assert!(engine.finished_naturally());
        assert_eq!(engine.seconds_remaining(), 0);
    }

    #[test]
    fn tick_outside_working_changes_nothing() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        assert!(engine.tick(1, now).is_none());
        assert_eq!(engine.seconds_remaining(), 0);

        engine.start_work(now);
        engine.tick(30, now);
        engine.complete_early(now);
        assert!(engine.tick(1, now).is_none());
        assert_eq!(engine.seconds_remaining(), 270);
    }

    #[test]
    fn continue_advances_and_keeps_start() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        run_stage(&mut engine, start + Duration::minutes(5));

        let event = engine.continue_session(start + Duration::minutes(5));
        assert!(matches!(event, Some(Event::StageContinued { .. })));
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.seconds_remaining(), 360);
        assert_eq!(engine.session_count(), 1);
        assert_eq!(engine.started_at(), Some(start));
        assert!(!engine.finished_naturally());
    }

    #[test]
    fn continue_past_schedule_end_reuses_last_stage() {
        let start = Utc::now();
        let mut engine = SessionEngine::new(EscalationSchedule::new(vec![1, 2], 600).unwrap());
        engine.start_work(start);
        for count in 1..=4u32 {
            run_stage(&mut engine, start);
            engine.continue_session(start);
            assert_eq!(engine.session_count(), count);
        }
        assert_eq!(engine.stage_index(), 1);
        assert_eq!(engine.seconds_remaining(), 120);
    }

    #[test]
    fn continue_after_cutoff_completes() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        run_stage(&mut engine, start);

        let event = engine.continue_session(start + Duration::minutes(56));
        assert!(matches!(event, Some(Event::SessionCompleted { .. })));
        assert_eq!(engine.phase(), Phase::Completed);
        assert!(engine.tick(1, start).is_none());
    }

    #[test]
    fn continue_just_before_cutoff_keeps_working() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        run_stage(&mut engine, start);
        engine.continue_session(start + Duration::minutes(56) - Duration::seconds(1));
        assert_eq!(engine.phase(), Phase::Working);
    }

    #[test]
    fn stop_without_progress_suggests_break() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        run_stage(&mut engine, now);
        assert!(matches!(engine.stop(now), Some(Event::BreakSuggested { .. })));
        assert_eq!(engine.phase(), Phase::BreakSuggestion);
    }

    #[test]
    fn stop_after_progress_asks_for_result() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        run_stage(&mut engine, now);
        engine.continue_session(now);
        run_stage(&mut engine, now);
        assert!(matches!(
            engine.stop(now),
            Some(Event::TaskEndRequested { early: false, .. })
        ));
        assert_eq!(engine.phase(), Phase::TaskComplete);
    }

    #[test]
    fn break_retry_restarts_first_stage() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        run_stage(&mut engine, start);
        engine.stop(start);

        assert!(engine.choose_break_action(BreakAction::Retry, start).is_some());
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.stage_index(), 0);
        assert_eq!(engine.seconds_remaining(), 300);
        assert_eq!(engine.session_count(), 0);
        assert_eq!(engine.started_at(), Some(start));
    }

    #[test]
    fn break_abandon_clears_session() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        engine.submit_reason("taxes", now);
        run_stage(&mut engine, now);
        engine.stop(now);

        match engine.choose_break_action(BreakAction::Abandon, now) {
            Some(Event::TaskAbandoned { reason, .. }) => assert_eq!(reason, "taxes"),
            other => panic!("Expected TaskAbandoned, got {other:?}"),
        }
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.started_at().is_none());
    }

    #[test]
    fn record_completion_reports_minutes_and_clears() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        engine.submit_reason("dishes", start);
        engine.tick(100, start);
        engine.complete_early(start);

        let event = engine.record_completion(" clean ", start + Duration::seconds(6 * 60 + 1));
        match event {
            Some(Event::TaskRecorded {
                reason,
                result,
                planned_minutes,
                actual_minutes,
                ..
            }) => {
                assert_eq!(reason, "dishes");
                assert_eq!(result, "clean");
                assert_eq!(planned_minutes, 5);
                assert_eq!(actual_minutes, 7);
            }
            other => panic!("Expected TaskRecorded, got {other:?}"),
        }
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.session_count(), 0);
        assert_eq!(engine.stage_index(), 0);
        assert_eq!(engine.seconds_remaining(), 0);
        assert_eq!(engine.task_reason(), "");
        assert!(engine.started_at().is_none());
    }

    #[test]
    fn actual_minutes_never_below_one() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        engine.complete_early(now);
        match engine.record_completion("", now) {
            Some(Event::TaskRecorded { actual_minutes, .. }) => assert_eq!(actual_minutes, 1),
            other => panic!("Expected TaskRecorded, got {other:?}"),
        }
    }

    #[test]
    fn reset_discards_completed_session() {
        let start = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(start);
        run_stage(&mut engine, start);
        engine.continue_session(start + Duration::hours(1));
        assert_eq!(engine.phase(), Phase::Completed);

        assert!(engine.reset(start).is_some());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.reset(start).is_none());
    }

    #[test]
    fn invalid_commands_are_noops() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        assert!(engine.complete_early(now).is_none());
        assert!(engine.continue_session(now).is_none());
        assert!(engine.stop(now).is_none());
        assert!(engine.choose_break_action(BreakAction::Retry, now).is_none());
        assert!(engine.record_completion("x", now).is_none());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let now = Utc::now();
        let mut engine = SessionEngine::default();
        engine.start_work(now);
        engine.tick(61, now);
        match engine.snapshot(now) {
            Event::StateSnapshot {
                phase,
                seconds_remaining,
                remaining_display,
                stage_minutes,
                ..
            } => {
                assert_eq!(phase, Phase::Working);
                assert_eq!(seconds_remaining, 239);
                assert_eq!(remaining_display, "3:59");
                assert_eq!(stage_minutes, 5);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn break_action_parses() {
        assert_eq!("retry".parse::<BreakAction>(), Ok(BreakAction::Retry));
        assert_eq!(" Abandon ".parse::<BreakAction>(), Ok(BreakAction::Abandon));
        assert!("later".parse::<BreakAction>().is_err());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn debug_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn every_transition_is_logged() {
        let now = Utc::now();
        let logs = debug_logs(|| {
            let mut engine = SessionEngine::default();
            engine.start_work(now);
            engine.submit_reason("inbox", now);
            run_stage(&mut engine, now);
            engine.stop(now);
            engine.choose_break_action(BreakAction::Retry, now);
            run_stage(&mut engine, now);
            engine.continue_session(now);
            engine.complete_early(now);
            engine.record_completion("cleared", now);
            engine.start_work(now);
            engine.reset(now);
        });
        for message in [
            "session started",
            "reason submitted",
            "stage expired",
            "suggesting a break",
            "retrying the first stage",
            "stage continued",
            "task completed early",
            "task closed",
            "session reset",
        ] {
            assert!(logs.contains(message), "no {message:?} in:\n{logs}");
        }
    }
}
