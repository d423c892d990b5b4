//! CutX CLI
//!
//! Removes marked segments from a media file and streams progress.
//!
//! # Usage
//!
//! ```bash
//! cutx serve --source talk.mov --port 8899
//! cutx cut --input talk.mov --delete 12.5-14 --delete 01:02-01:05.25 --format mp4
//! cutx plan --duration 10 --delete 2-3
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cutx::cli::{commands, Cli, Commands};
use cutx::utils::logging;

/// Main entry point for the CutX CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    logging::init(&config.logging.level, config.logging.json);

    info!("Starting CutX {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(args) => commands::serve(args, config).await,
        Commands::Cut(args) => commands::cut(args, config).await,
        Commands::Plan(args) => commands::plan(args, config).await,
    }
}
