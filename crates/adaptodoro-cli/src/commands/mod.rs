pub mod config;
pub mod history;
pub mod run;
pub mod stats;

use adaptodoro_core::{App, Config, Database, SystemClock};

/// Open the ledger database and build the app root from `config`.
pub fn open_app(config: &Config) -> Result<App<Database, SystemClock>, Box<dyn std::error::Error>> {
    let db = Database::open()?.with_snapshot_key(config.ledger.storage_key.clone());
    Ok(App::from_config(db, SystemClock, config)?)
}
