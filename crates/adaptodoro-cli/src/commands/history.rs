use clap::Args;

use super::open_app;
use adaptodoro_core::Config;

#[derive(Args)]
pub struct HistoryArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
    /// Only show the most recent N tasks
    #[arg(long)]
    limit: Option<usize>,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let app = open_app(&config)?;
    let history = app.ledger().history();
    let skip = args
        .limit
        .map(|n| history.len().saturating_sub(n))
        .unwrap_or(0);
    let shown = &history[skip..];

    if args.json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No recorded tasks yet.");
        return Ok(());
    }
    for entry in shown {
        let when = entry
            .recorded_at_utc()
            .map(|dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| entry.recorded_at.clone());
        println!(
            "{when}  {} -> {}  (planned {} min, actual {} min, +{} EXP)",
            display_or_dash(&entry.reason),
            entry.result,
            entry.planned_minutes,
            entry.actual_minutes,
            entry.exp_gained
        );
    }
    Ok(())
}

fn display_or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}
