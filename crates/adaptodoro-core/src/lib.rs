//! # Adaptodoro Core Library
//!
//! This library provides the core logic for Adaptodoro, an adaptive pomodoro
//! timer for tasks you would rather not start. Work begins with a five-minute
//! stage; each time a stage runs out you may continue into a slightly longer
//! one, until roughly an hour has passed.
//!
//! ## Architecture
//!
//! - **Session Engine**: A tick-driven state machine; the host calls `tick()`
//!   once per second while a stage is running
//! - **Progress Ledger**: Experience, level, total work time and the history
//!   of recorded tasks
//! - **Storage**: A single JSON snapshot in a SQLite key-value table, and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`App`]: Application root wiring engine, ledger, store and clock
//! - [`SessionEngine`]: Session state machine
//! - [`ProgressLedger`]: Rewards and history
//! - [`Database`]: Snapshot persistence
//! - [`Config`]: Application configuration management

pub mod app;
pub mod clock;
pub mod error;
pub mod events;
pub mod ledger;
pub mod session;
pub mod storage;

pub use app::{App, AppState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use ledger::{HistoryEntry, LedgerSnapshot, LedgerStats, ProgressLedger};
pub use session::{BreakAction, EscalationSchedule, Phase, SessionEngine};
pub use storage::{Config, Database, MemoryStore, SnapshotStore};
