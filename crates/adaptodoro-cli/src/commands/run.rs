//! Interactive session host.
//!
//! Delivers one tick per `session.tick_interval_ms` while the phase is
//! `Working` and maps stdin lines to session inputs. The ticker is only
//! polled while a stage is running and is re-armed whenever one starts, so
//! no stale tick ever reaches another phase.

use std::io::Write;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::open_app;
use adaptodoro_core::session::format_remaining;
use adaptodoro_core::{App, BreakAction, Config, Database, Event, Phase, SessionEngine, SystemClock};

#[derive(Args)]
pub struct RunArgs {
    /// Print every event as a JSON line instead of prose
    #[arg(long)]
    json: bool,
}

/// A line of user input, interpreted for the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Reason(String),
    Done,
    Continue,
    Stop,
    Break(BreakAction),
    Result(String),
    Reset,
    Status,
    Quit,
    Unknown(String),
}

pub fn interpret(session: &SessionEngine, line: &str) -> Input {
    let trimmed = line.trim();
    let word = trimmed.to_ascii_lowercase();
    match word.as_str() {
        "quit" | "exit" | "q" => return Input::Quit,
        "status" => return Input::Status,
        _ => {}
    }
    if session.awaiting_reason() {
        return Input::Reason(trimmed.to_string());
    }
    match session.phase() {
        Phase::Idle => match word.as_str() {
            "" | "start" => Input::Start,
            _ => Input::Unknown(trimmed.to_string()),
        },
        Phase::Working => match word.as_str() {
            "done" | "d" => Input::Done,
            _ => Input::Unknown(trimmed.to_string()),
        },
        Phase::ContinueCheck => match word.as_str() {
            "" | "continue" | "c" | "y" | "yes" => Input::Continue,
            "stop" | "n" | "no" => Input::Stop,
            _ => Input::Unknown(trimmed.to_string()),
        },
        Phase::BreakSuggestion => match word.parse::<BreakAction>() {
            Ok(action) => Input::Break(action),
            Err(_) => Input::Unknown(trimmed.to_string()),
        },
        Phase::TaskComplete => Input::Result(trimmed.to_string()),
        Phase::Completed => match word.as_str() {
            "" | "reset" => Input::Reset,
            _ => Input::Unknown(trimmed.to_string()),
        },
    }
}

fn apply(app: &mut App<Database, SystemClock>, input: Input) -> Option<Event> {
    match input {
        Input::Start => app.start_work(),
        Input::Reason(text) => app.submit_reason(&text),
        Input::Done => app.complete_early(),
        Input::Continue => app.continue_session(),
        Input::Stop => app.stop(),
        Input::Break(action) => app.choose_break_action(action),
        Input::Result(text) => app.record_completion(&text),
        Input::Reset => app.reset(),
        Input::Status | Input::Quit | Input::Unknown(_) => None,
    }
}

fn prompt(session: &SessionEngine) -> String {
    if session.awaiting_reason() {
        return format!(
            "What are you putting off? (the {}-minute timer is already running)",
            session.stage_minutes()
        );
    }
    match session.phase() {
        Phase::Idle => "Type 'start' to take on another task, or 'quit'.".to_string(),
        Phase::Working => format!(
            "Working: {} left of {} min. Type 'done' when the task is finished.",
            format_remaining(session.seconds_remaining()),
            session.stage_minutes()
        ),
        Phase::ContinueCheck => format!(
            "{} minutes done! Next up: {} minutes, starting right away. [continue/stop]",
            session.stage_minutes(),
            session.next_stage_minutes()
        ),
        Phase::BreakSuggestion => {
            "Five minutes was too much today. Split the task into a smaller first step. [retry/abandon]"
                .to_string()
        }
        Phase::TaskComplete => "What did you get done? (leave blank for the default)".to_string(),
        Phase::Completed => {
            "Session complete: close to an hour of work. Type 'reset' to start over.".to_string()
        }
    }
}

fn describe(app: &App<Database, SystemClock>, event: &Event) -> Option<String> {
    match event {
        Event::TaskRecorded { actual_minutes, .. } => {
            let ledger = app.ledger();
            let gained = ledger.history().last().map(|e| e.exp_gained).unwrap_or(0);
            Some(format!(
                "Recorded {actual_minutes} min (+{gained} EXP). Lv.{} {}/100 EXP, {} min in total.",
                ledger.level(),
                ledger.exp_into_level(),
                ledger.total_work_minutes()
            ))
        }
        Event::TaskAbandoned { .. } => Some("Set aside for now. Nothing recorded.".to_string()),
        Event::SessionReset { .. } => Some("Session discarded.".to_string()),
        _ => None,
    }
}

fn starts_stage(event: &Event) -> bool {
    matches!(
        event,
        Event::SessionStarted { .. } | Event::StageContinued { .. } | Event::BreakRetried { .. }
    )
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

struct Output {
    json: bool,
}

impl Output {
    fn event(&self, app: &App<Database, SystemClock>, event: &Event) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        if self.json {
            let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
            writeln!(out, "{line}")?;
        } else if let Some(text) = describe(app, event) {
            writeln!(out, "{text}")?;
        }
        out.flush()
    }

    fn prompt(&self, app: &App<Database, SystemClock>) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        if self.json {
            let line = serde_json::to_string(&app.state()).map_err(std::io::Error::other)?;
            writeln!(out, "{line}")?;
        } else {
            writeln!(out, "{}", prompt(app.session()))?;
        }
        out.flush()
    }

    fn countdown(&self, app: &App<Database, SystemClock>) -> std::io::Result<()> {
        let remaining = app.session().seconds_remaining();
        if self.json || remaining % 60 != 0 {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        writeln!(out, "  {} left", format_remaining(remaining))?;
        out.flush()
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    config.validate()?;
    let mut app = open_app(&config)?;
    let period = Duration::from_millis(config.session.tick_interval_ms);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(&mut app, period, Output { json: args.json }))?;
    Ok(())
}

async fn drive(
    app: &mut App<Database, SystemClock>,
    period: Duration,
    output: Output,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Some(event) = app.start_work() {
        output.event(app, &event)?;
    }
    let mut ticker = new_ticker(period);
    output.prompt(app)?;

    loop {
        tokio::select! {
            _ = ticker.tick(), if app.session().phase().is_counting() => {
                match app.tick() {
                    Some(event) => {
                        output.event(app, &event)?;
                        output.prompt(app)?;
                    }
                    None => output.countdown(app)?,
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match interpret(app.session(), &line) {
                    Input::Quit => break,
                    Input::Status => output.prompt(app)?,
                    Input::Unknown(text) => {
                        tracing::debug!(%text, phase = app.session().phase().label(), "ignored input");
                        output.prompt(app)?;
                    }
                    input => {
                        if let Some(event) = apply(app, input) {
                            if starts_stage(&event) {
                                ticker = new_ticker(period);
                            }
                            output.event(app, &event)?;
                        }
                        output.prompt(app)?;
                    }
                }
            }
        }
    }

    if app.session().phase() != Phase::Idle {
        tracing::info!(phase = app.session().phase().label(), "leaving with an unfinished session");
    }
    Ok(())
}
