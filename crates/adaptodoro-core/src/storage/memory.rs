use std::cell::{Cell, RefCell};

use super::SnapshotStore;
use crate::error::{CoreError, Result};

/// In-process snapshot store for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RefCell<Option<String>>,
    writes: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `record`.
    pub fn with_record(record: impl Into<String>) -> Self {
        let store = Self::default();
        *store.record.borrow_mut() = Some(record.into());
        store
    }

    pub fn record(&self) -> Option<String> {
        self.record.borrow().clone()
    }

    /// Number of successful saves so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Make every following save fail, leaving the record untouched.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.record.borrow().clone())
    }

    fn save(&self, snapshot: &str) -> Result<()> {
        if self.fail_writes.get() {
            return Err(CoreError::Custom("memory store is read-only".into()));
        }
        *self.record.borrow_mut() = Some(snapshot.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
