//! Snapquip CLI - photo in, funny caption out.
//!
//! Snapquip picks a photo from the gallery directory (or accepts one as an
//! argument, or reads a captured frame from stdin), sends it to the
//! configured vision model with a fixed prompt, and prints the caption.
//!
//! # Usage
//!
//! ```bash
//! # Interactive gallery pick
//! snapquip caption
//!
//! # Caption a specific photo
//! snapquip caption ./photos/dog.jpg
//!
//! # Caption a captured frame
//! grab-frame | snapquip caption --stdin
//!
//! # View configuration
//! snapquip config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Snapquip - photo in, funny caption out.
#[derive(Parser, Debug)]
#[command(name = "snapquip")]
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
    /// Pick or ingest a photo and request a caption
    Caption(cli::caption::CaptionArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match snapquip_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `snapquip config path`."
            );
            snapquip_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Snapquip v{}", snapquip_core::VERSION);

    match cli.command {
        Commands::Caption(args) => cli::caption::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
