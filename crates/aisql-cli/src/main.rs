use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use aisql::config::Config;
use aisql_cli::commands::{
    CallCommand, ConfigCommand, ExtractCommand, FunctionsCommand, ReassembleCommand,
};
use aisql_cli::error::CliResult;
use aisql_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "aisql")]
#[command(about = "aisql - LLM-backed SQL functions from the command line")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "List the function catalogue")]
    Functions(FunctionsCommand),

    #[clap(about = "Call a function against the configured provider")]
    Call(CallCommand),

    #[clap(about = "Rebuild completion text from stream fragments")]
    Reassemble(ReassembleCommand),

    #[clap(about = "Recover JSON from model output")]
    Extract(ExtractCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,aisql=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Functions(cmd) => cmd.execute(format).await,
        Command::Call(cmd) => cmd.execute(&config, format).await,
        Command::Reassemble(cmd) => cmd.execute(format).await,
        Command::Extract(cmd) => cmd.execute(format).await,
        Command::Config(cmd) => cmd.execute(cli.config.as_deref(), &config, format).await,
    }
}
