//! txlab CLI
//!
//! Runs the transaction-pitfall demonstration catalog and narrates each
//! scenario's outcome.
//!
//! # Commands
//!
//! - `run` - Run the catalog (or one scenario) and narrate the outcomes
//! - `list` - List the catalog entries

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Transaction-pitfall demonstrations on an embedded record store.
#[derive(Parser)]
#[command(name = "txlab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demonstration catalog
    Run {
        /// Run only the named scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the catalog entries
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run { scenario, format } => {
            commands::run::run(scenario.as_deref(), &format)?;
        }
        Commands::List => {
            commands::list::run();
        }
    }

    Ok(())
}
