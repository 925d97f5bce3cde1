//! recirc CLI - render, inspect and script feedback graphs.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recirc")]
#[command(author, version, about = "Multichannel feedback graph engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a graph document to a WAV file
    Render(commands::render::RenderArgs),

    /// List node types and their parameters
    Nodes(commands::nodes::NodesArgs),

    /// Validate a graph document
    Check(commands::check::CheckArgs),

    /// Feed a script of JSON control messages through a processor
    Replay(commands::replay::ReplayArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Nodes(args) => commands::nodes::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Replay(args) => commands::replay::run(args),
    }
}
