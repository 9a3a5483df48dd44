pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Studio CLI - operator tooling for the Studio CMS API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "STUDIO_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API server"
    )]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Session token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Invoke a procedure, e.g. `studio call investor.getPublished`")]
    Call(commands::call::CallArgs),

    #[command(about = "Check server health status from the /health endpoint")]
    Health,
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
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Call(args) => commands::call::handle(&server, args, output_format).await,
        Commands::Health => commands::health::handle(&server, output_format).await,
    }
}
