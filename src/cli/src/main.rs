//! Waypoint CLI - submit routes to a Waypoint server and poll their tokens.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{health, route};
use output::OutputFormat;

/// Waypoint - asynchronous route distance client
#[derive(Parser)]
#[command(
    name = "waypoint",
    version,
    about = "Waypoint - asynchronous route distance client",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "WAYPOINT_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a route and print its token
    Submit(route::SubmitArgs),

    /// Show the status of a submitted route
    Status(route::StatusArgs),

    /// Check server health
    Health(health::HealthArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let client = client::ApiClient::new(&cli.server)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Submit(args) => route::submit(args, &client, format).await,
        Commands::Status(args) => route::status(args, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
