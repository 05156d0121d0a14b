use anyhow::Result;
use clap::{Parser, Subcommand};
use ditto_cli::transport;
use ditto_cli::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ditto")]
#[command(author, version = env!("DITTO_VERSION"), about = "Ditto - teachable question/answer dialogues for chatbots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the bot and teach it from the terminal
    Chat {
        /// Guild the messages are sent in
        #[arg(short, long, default_value = "10000")]
        guild: String,

        /// User id of the speaker
        #[arg(short, long, default_value = "1")]
        user: String,

        /// Authority level of the speaker
        #[arg(short, long, default_value = "4")]
        authority: u32,
    },

    /// Show dialogue statistics
    Stats,

    /// Print the effective configuration
    Config {
        /// Write it to the default config location
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ditto_cli=debug"
    } else {
        "ditto_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Chat {
            guild,
            user,
            authority,
        } => transport::cli::run_chat(config, guild, user, authority).await,
        Commands::Stats => transport::cli::run_stats(config).await,
        Commands::Config { init } => transport::cli::run_config(&config, init),
    }
}
