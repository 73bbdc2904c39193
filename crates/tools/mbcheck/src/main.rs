use anyhow::Result;
use clap::{Parser, Subcommand};
use mbcheck::{run, RunOptions, Scenario};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mbcheck")]
#[command(about = "Multiblock scenario checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the scenario's structure without running recipes
    Check {
        /// Scenario file (KDL)
        scenario: PathBuf,
    },

    /// Validate the structure, then tick the manager
    Run {
        /// Scenario file (KDL)
        scenario: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value_t = 100)]
        ticks: u64,

        /// Seed for chanced recipe contents
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Restore structure caches from this file first
        #[arg(long)]
        load: Option<PathBuf>,

        /// Save structure caches to this file afterwards
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let (path, options) = match cli.command {
        Commands::Check { scenario } => (scenario, RunOptions::default()),
        Commands::Run {
            scenario,
            ticks,
            seed,
            load,
            save,
        } => (
            scenario,
            RunOptions {
                ticks,
                seed,
                load,
                save,
            },
        ),
    };

    let scenario = Scenario::from_file(&path)?;
    tracing::info!(path = %path.display(), controller = %scenario.controller, "scenario loaded");

    let report = run(scenario, &options)?;
    print!("{report}");

    if !report.is_formed() {
        std::process::exit(1);
    }
    Ok(())
}
