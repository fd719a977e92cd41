use clap::Subcommand;
use cadence_core::{Config, CoreError, TechniqueCatalog};

#[derive(Subcommand)]
pub enum TechniqueAction {
    /// List available techniques
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one technique as JSON
    Show {
        /// Technique key (e.g. "4-7-8", "pomodoro")
        key: String,
    },
}

pub fn run(action: TechniqueAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = TechniqueCatalog::from_config(&Config::load()?);

    match action {
        TechniqueAction::List { json } => {
            if json {
                let techniques: Vec<_> = catalog.iter().collect();
                println!("{}", serde_json::to_string_pretty(&techniques)?);
                return Ok(());
            }
            for technique in catalog.iter() {
                let phases: Vec<String> = technique
                    .phases
                    .iter()
                    .map(|p| format!("{} {}s", p.name, p.duration_seconds))
                    .collect();
                println!(
                    "{:<10} {:<20} {} x{}",
                    technique.key,
                    technique.name,
                    phases.join(", "),
                    technique.total_cycles
                );
            }
        }
        TechniqueAction::Show { key } => {
            let technique = catalog.get(&key).ok_or(CoreError::UnknownTechnique(key))?;
            println!("{}", serde_json::to_string_pretty(technique)?);
        }
    }
    Ok(())
}
