pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "qmgate")]
#[command(about = "qmgate - operator tool for the request gatekeeper")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List public routes and the prefix to category table")]
    Routes,

    #[command(about = "Show whether a path is public and which category guards it")]
    Resolve {
        #[arg(help = "Request path, e.g. /inventory/stock-in/new")]
        path: String,
    },

    #[command(about = "Run the gatekeeper against in-memory stores and print the verdict")]
    Simulate(commands::simulate::SimulateArgs),

    #[command(about = "Session management against the configured database")]
    Session {
        #[command(subcommand)]
        cmd: commands::session::SessionCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Routes => commands::routes::list(output_format),
        Commands::Resolve { path } => commands::routes::resolve(&path, output_format),
        Commands::Simulate(args) => commands::simulate::handle(args, output_format).await,
        Commands::Session { cmd } => commands::session::handle(cmd, output_format).await,
    }
}
