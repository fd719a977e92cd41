use clap::Args;
use cadence_core::storage::Database;

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of segments to show
    #[arg(long, short = 'n', default_value = "20")]
    limit: usize,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let segments = db.recent_segments(args.limit)?;
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}
