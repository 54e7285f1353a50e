pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file in addition to stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Listen address, overriding the configured one
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Analyze a single URL and print the critique
    Analyze {
        /// Target URL
        #[arg(required = true)]
        url: String,
    },

    /// Audit a single landing page and print the outreach email
    Audit {
        /// Target URL
        #[arg(required = true)]
        url: String,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr } => {
            info!("Starting audit API server");
            commands::serve(addr).await
        }
        Commands::Analyze { url } => {
            info!("Analyzing {}", url);
            commands::run_once(url, crate::pipeline::AnalysisKind::Analyze).await
        }
        Commands::Audit { url } => {
            info!("Auditing {}", url);
            commands::run_once(url, crate::pipeline::AnalysisKind::Audit).await
        }
    }
}
