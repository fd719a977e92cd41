use std::time::Duration;

use clap::Args;
use cadence_core::storage::Database;
use cadence_core::{
    Config, Control, CoreError, Event, IntervalScheduler, SessionEngine, SessionStatus, TechniqueCatalog,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Technique key (e.g. "4-7-8", "pomodoro")
    key: String,
    /// Override the technique's number of cycles
    #[arg(long)]
    cycles: Option<u32>,
    /// Milliseconds per engine tick (one tick counts one second)
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Do not record segments to the database
    #[arg(long)]
    no_record: bool,
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to serialize event"),
    }
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" | "q" | "quit" => Some(Control::Stop),
        _ => None,
    }
}

/// Forward stdin commands to the scheduler until stdin closes.
async fn read_controls(tx: mpsc::UnboundedSender<Control>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_control(&line) {
            Some(control) => {
                if tx.send(control).is_err() {
                    break;
                }
            }
            None => eprintln!("commands: p (pause), r (resume), s/q (stop)"),
        }
    }
    debug!("stdin closed");
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = TechniqueCatalog::from_config(&config);
    let mut technique = catalog
        .get(&args.key)
        .cloned()
        .ok_or_else(|| CoreError::UnknownTechnique(args.key.clone()))?;
    if let Some(cycles) = args.cycles {
        technique.total_cycles = cycles;
    }
    technique.validate()?;

    let tick_ms = args.tick_ms.unwrap_or(config.engine.tick_ms).max(1);
    let mut engine = if config.engine.record_segments && !args.no_record {
        SessionEngine::with_recorder(Database::open()?)?
    } else {
        SessionEngine::new()
    };

    engine.start(technique)?.iter().for_each(print_event);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let status = runtime.block_on(async {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_controls(tx.clone()));
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(Control::Stop);
            }
        });

        let scheduler = IntervalScheduler::new(Duration::from_millis(tick_ms));
        scheduler.run(&mut engine, rx, print_event).await
    });
    // The stdin reader blocks on a read that cannot be cancelled.
    runtime.shutdown_timeout(Duration::from_millis(100));

    if status != SessionStatus::Idle {
        print_event(&engine.snapshot_event());
    }
    engine.shutdown_recorder().iter().for_each(print_event);
    info!(?status, "run finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stdin_controls() {
        assert_eq!(parse_control("p"), Some(Control::Pause));
        assert_eq!(parse_control(" r \n"), Some(Control::Resume));
        assert_eq!(parse_control("q"), Some(Control::Stop));
        assert_eq!(parse_control("stop"), Some(Control::Stop));
        assert_eq!(parse_control("x"), None);
    }
}
