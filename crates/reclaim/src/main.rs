//! Reclaim CLI - find media worth cleaning up in a photo and video library.
//!
//! Reclaim walks a folder of photos and videos and sorts it into duplicates,
//! similar shots, blurry photos, photos of text, oversized videos and the
//! usual metadata categories. Progress is kept per library, so an
//! interrupted scan resumes where it stopped.
//!
//! # Usage
//!
//! ```bash
//! # Scan a folder and write a report
//! reclaim scan ~/Pictures --output report.json
//!
//! # Show how far the last scan got
//! reclaim status ~/Pictures
//!
//! # Forget everything recorded for a folder
//! reclaim reset ~/Pictures
//!
//! # View configuration
//! reclaim config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Reclaim - find duplicate, similar, blurry and oversized media.
#[derive(Parser, Debug)]
#[command(name = "reclaim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a library folder, resuming any earlier scan
    Scan(cli::scan::ScanArgs),

    /// Show the recorded progress and dashboard for a library folder
    Status(cli::status::StatusArgs),

    /// Discard everything recorded for a library folder
    Reset(cli::reset::ResetArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match reclaim_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Validate the file with `reclaim config check`."
            );
            reclaim_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Reclaim v{}", reclaim_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Status(args) => cli::status::execute(args, &config),
        Commands::Reset(args) => cli::reset::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args, &config),
    }
}
