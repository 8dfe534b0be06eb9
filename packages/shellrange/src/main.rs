use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

mod api;
mod commands;
mod config;
mod tty;

use api::{ApiClient, LabServer};
use config::{FileConfig, RangeConfig};

#[derive(Parser)]
#[command(name = "range")]
#[command(about = "Terminal client for cyber-range lab environments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.shellrange)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Lab server base URL (overrides config.toml and RANGE_SERVER__URL)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available labs
    Labs(LabsArgs),

    /// Show a lab's details and guide
    Info(InfoArgs),

    /// Start a lab instance and attach to it
    Start(StartArgs),

    /// Attach the terminal to a running instance
    Attach(AttachArgs),

    /// Stop a running instance
    Stop(StopArgs),
}

#[derive(Parser)]
struct LabsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct InfoArgs {
    /// Lab id (see `range labs`)
    lab_id: u64,
}

#[derive(Parser)]
struct StartArgs {
    /// Lab id (see `range labs`)
    lab_id: u64,

    /// Start the instance without attaching to it
    #[arg(long)]
    no_attach: bool,
}

#[derive(Parser)]
struct AttachArgs {
    /// Instance id from `range start`
    instance_id: u64,
}

#[derive(Parser)]
struct StopArgs {
    /// Instance id from `range start`
    instance_id: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "shellrange=debug,lab_session=debug"
    } else {
        "shellrange=warn,lab_session=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let config = RangeConfig::new(cli.data_dir.clone())?;
    let file_config: FileConfig = config::load_config(&config.data_dir).extract()?;
    let base_url = cli.server.unwrap_or(file_config.server.url);
    let api = ApiClient::new(LabServer::new(base_url));

    match cli.command {
        Commands::Labs(args) => commands::labs_command(&api, args.json).await,
        Commands::Info(args) => commands::info_command(&api, args.lab_id).await,
        Commands::Start(args) => commands::start_command(&api, args.lab_id, args.no_attach).await,
        Commands::Attach(args) => commands::attach_command(&api, args.instance_id).await,
        Commands::Stop(args) => commands::stop_command(&api, args.instance_id).await,
    }
}
