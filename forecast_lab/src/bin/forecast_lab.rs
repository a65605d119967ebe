//! # forecast-lab
//!
//! Run the configured (horizon x model) experiment matrix and print the
//! resulting metrics table.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use forecast_lab::{run_experiments, RunConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forecast-lab", version)]
#[command(about = "Multi-horizon forecasting experiments", long_about = None)]
struct Cli {
    /// YAML or JSON run configuration; defaults apply when the file is absent
    #[arg(short, long, default_value = "configs/baseline.yaml")]
    config: PathBuf,

    /// Print the resolved configuration as JSON before running
    #[arg(long)]
    print_config: bool,
}

fn load_config(path: &Path) -> forecast_lab::Result<RunConfig> {
    if path.exists() {
        info!(path = %path.display(), "loading configuration");
        RunConfig::from_file(path)
    } else {
        warn!(path = %path.display(), "configuration file not found, using defaults");
        Ok(RunConfig::default())
    }
}

fn run(cli: &Cli) -> forecast_lab::Result<()> {
    let config = load_config(&cli.config)?;
    if cli.print_config {
        println!("{}", config.to_json_pretty()?);
    }

    let results = run_experiments(&config)?;
    println!("{results}");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forecast_lab=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
