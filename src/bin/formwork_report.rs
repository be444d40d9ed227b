//! Formwork report CLI.
//!
//! Runs the batch analysis over a JSON scene and prints the CSV report.
//!
//! ```bash
//! formwork-report --scene building.json
//! formwork-report --scene building.json --config formwork.json --csv out.csv --json out.json
//! RUST_LOG=formwork=debug formwork-report --scene building.json --precision
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use formwork::config::AnalysisConfig;
use formwork::error::ConfigError;
use formwork::export::write_csv;
use formwork::scene::Scene;
use formwork::session::AnalysisSession;
use formwork::{FormworkAnalysis, FormworkError};
use tracing::info;

#[derive(Parser)]
#[command(name = "formwork-report")]
#[command(about = "Formwork area takeoff with contact deduction", long_about = None)]
struct Cli {
    /// Scene file (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Analysis configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the CSV report here instead of stdout
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Restrict deduction neighbours to the host's pour zone
    #[arg(long)]
    precision: bool,

    /// Evaluate elements in parallel
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<(), FormworkError> {
    // Default: WARN for everything, INFO for formwork.
    // Override with RUST_LOG (e.g. RUST_LOG=formwork=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("formwork=info".parse().unwrap_or_default())
        .add_directive("formwork_report=info".parse().unwrap_or_default());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::default(),
    };
    config.precision_mode |= cli.precision;
    config.parallel |= cli.parallel;

    let mut model = Scene::from_path(&cli.scene)?.into_model()?;
    let mut session = AnalysisSession::new(config)?;
    let report = FormworkAnalysis::new().run(&mut model, &mut session)?;

    match &cli.csv {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_csv(&report, &mut out)?;
            out.flush()?;
            info!(path = %path.display(), "Wrote CSV report");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_csv(&report, &mut out)?;
        }
    }

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(ConfigError::from)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    info!(
        elements = report.summary.element_count,
        pieces = report.summary.piece_count,
        net_area_m2 = report.summary.net_area_m2,
        "Done"
    );
    Ok(())
}
