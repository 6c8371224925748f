use super::open_app;
use adaptodoro_core::Config;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let app = open_app(&config)?;
    println!("{}", serde_json::to_string_pretty(&app.ledger().stats())?);
    Ok(())
}

pub fn reset_all(confirmed: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirmed {
        return Err("reset-all erases every recorded task and cannot be undone; pass --yes to confirm".into());
    }
    let config = Config::load()?;
    let mut app = open_app(&config)?;
    let erased = app.ledger().history().len();
    let event = app.reset_all_checked()?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    eprintln!("erased {erased} recorded task(s)");
    Ok(())
}
