//! react-agent CLI
//!
//! Talk to the agent from a terminal: inspect configuration, run the
//! scripted demo, or chat interactively.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_runtime::Settings;

mod commands;

use commands::{chat, config, demo};

/// Tool-calling AI agent on the command line
#[derive(Parser, Debug)]
#[command(name = "agent-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the model for this run
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the effective configuration and check the API key
    Config(config::ConfigArgs),

    /// Run a short scripted conversation
    Demo(demo::DemoArgs),

    /// Enter interactive chat mode
    Chat(chat::ChatArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let mut settings = Settings::from_env()?;
    if let Some(model) = cli.model.clone() {
        settings.model_name = model;
    }

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_filter())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Config(args) => config::run(&args, &settings),
        Commands::Demo(args) => demo::run(&args, &settings).await,
        Commands::Chat(args) => chat::run(&args, &settings).await,
    }
}
