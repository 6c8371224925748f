//! Application root.
//!
//! Owns the one session engine, the one progress ledger, the snapshot store
//! and the clock. The presentation layer calls the input methods below and
//! re-reads [`App::state`] after each of them.
//!
//! Completed tasks flow engine -> `Event::TaskRecorded` -> ledger -> store.
//! Writing the snapshot is always the last step of a ledger mutation, and a
//! failed write is logged rather than surfaced.

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::events::Event;
use crate::ledger::{snapshot, LedgerStats, ProgressLedger};
use crate::session::{BreakAction, EscalationSchedule, SessionEngine};
use crate::storage::{Config, SnapshotStore};

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct AppState {
    pub session: Event,
    pub ledger: LedgerStats,
}

pub struct App<S: SnapshotStore, C: Clock = SystemClock> {
    engine: SessionEngine,
    ledger: ProgressLedger,
    store: S,
    clock: C,
}

impl<S: SnapshotStore, C: Clock> App<S, C> {
    /// Restore the ledger from `store` and start with an idle session.
    ///
    /// A missing record gives an empty ledger. An unreadable record is
    /// logged and also gives an empty ledger.
    pub fn new(store: S, clock: C, schedule: EscalationSchedule) -> Self {
        let ledger = restore_ledger(&store);
        Self {
            engine: SessionEngine::new(schedule),
            ledger,
            store,
            clock,
        }
    }

    /// Like [`App::new`], taking schedule and ledger settings from `config`.
    ///
    /// # Errors
    /// Returns an error if the configured schedule is invalid.
    pub fn from_config(store: S, clock: C, config: &Config) -> Result<Self> {
        let schedule = config.escalation_schedule()?;
        let mut app = Self::new(store, clock, schedule);
        app.ledger = app
            .ledger
            .with_default_result(config.ledger.default_result.clone());
        Ok(app)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.clock.now())
    }

    pub fn state(&self) -> AppState {
        AppState {
            session: self.snapshot(),
            ledger: self.ledger.stats(),
        }
    }

    // ── Session inputs ───────────────────────────────────────────────

    pub fn start_work(&mut self) -> Option<Event> {
        self.engine.start_work(self.clock.now())
    }

    pub fn submit_reason(&mut self, text: &str) -> Option<Event> {
        self.engine.submit_reason(text, self.clock.now())
    }

    pub fn complete_early(&mut self) -> Option<Event> {
        self.engine.complete_early(self.clock.now())
    }

    pub fn continue_session(&mut self) -> Option<Event> {
        self.engine.continue_session(self.clock.now())
    }

    pub fn stop(&mut self) -> Option<Event> {
        self.engine.stop(self.clock.now())
    }

    pub fn choose_break_action(&mut self, action: BreakAction) -> Option<Event> {
        self.engine.choose_break_action(action, self.clock.now())
    }

    /// One second of countdown. Delivered by the host while `Working`.
    pub fn tick(&mut self) -> Option<Event> {
        self.tick_by(1)
    }

    pub fn tick_by(&mut self, delta_secs: u64) -> Option<Event> {
        self.engine.tick(delta_secs, self.clock.now())
    }

    /// Close the task, credit it to the ledger and persist.
    pub fn record_completion(&mut self, result_text: &str) -> Option<Event> {
        let event = self.engine.record_completion(result_text, self.clock.now())?;
        if let Event::TaskRecorded {
            reason,
            result,
            planned_minutes,
            actual_minutes,
            at,
        } = &event
        {
            self.ledger
                .record_completion(reason, result, *planned_minutes, *actual_minutes, *at);
            self.persist_logged();
        }
        Some(event)
    }

    /// Drop the current session without recording it.
    pub fn reset(&mut self) -> Option<Event> {
        self.engine.reset(self.clock.now())
    }

    // ── Ledger inputs ────────────────────────────────────────────────

    /// Erase all history, experience and work time, then persist.
    pub fn reset_all(&mut self) -> Event {
        self.ledger.reset_all();
        self.persist_logged();
        Event::LedgerReset {
            at: self.clock.now(),
        }
    }

    /// Like [`App::reset_all`], but a failed write is returned to the caller.
    /// The in-memory ledger is erased either way.
    ///
    /// # Errors
    /// Returns an error if encoding or the store write fails.
    pub fn reset_all_checked(&mut self) -> Result<Event> {
        self.ledger.reset_all();
        self.persist()?;
        Ok(Event::LedgerReset {
            at: self.clock.now(),
        })
    }

    /// Write the full ledger snapshot to the store.
    ///
    /// # Errors
    /// Returns an error if encoding or the store write fails. The previously
    /// stored record is then left as it was.
    pub fn persist(&self) -> Result<()> {
        let record = snapshot::encode(&self.ledger)?;
        self.store.save(&record)
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            tracing::error!(error = %e, "failed to persist ledger snapshot");
        }
    }
}

fn restore_ledger<S: SnapshotStore>(store: &S) -> ProgressLedger {
    match store.load() {
        Ok(Some(raw)) => {
            let restored = snapshot::decode(&raw);
            for issue in &restored.issues {
                tracing::warn!(%issue, "ledger snapshot recovered with defaults");
            }
            restored.ledger
        }
        Ok(None) => ProgressLedger::new(),
        Err(e) => {
            tracing::warn!(error = %e, "ledger snapshot unreadable, starting empty");
            ProgressLedger::new()
        }
    }
}
