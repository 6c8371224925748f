mod config;
pub mod database;
mod memory;

pub use config::{Config, LedgerConfig, SessionConfig};
pub use database::{Database, DEFAULT_SNAPSHOT_KEY};
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Durable home of the ledger snapshot: a single record, replaced whole.
pub trait SnapshotStore {
    /// The stored record, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>>;

    /// Atomically replace the stored record.
    fn save(&self, snapshot: &str) -> Result<()>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for &T {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, snapshot: &str) -> Result<()> {
        (**self).save(snapshot)
    }
}

/// Returns the data directory, creating it if needed.
///
/// `ADAPTODORO_HOME` overrides the location. Otherwise this is
/// `~/.config/adaptodoro[-dev]/`, with `ADAPTODORO_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("ADAPTODORO_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ADAPTODORO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("adaptodoro-dev")
            } else {
                base_dir.join("adaptodoro")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
