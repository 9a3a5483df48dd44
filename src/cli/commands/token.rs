use clap::Subcommand;
use serde_json::json;

use crate::auth::{issue_token, Claims};
use crate::cli::utils::print_data;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a session token with the server's JWT secret")]
    Issue {
        #[arg(help = "User id to place in the token subject")]
        sub: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Email address")]
        email: Option<String>,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { sub, name, email, hours } => {
            let security = &config().security;
            let mut claims = Claims::new(sub, hours.unwrap_or(security.jwt_expiry_hours));
            claims.name = name;
            claims.email = email;

            let token = issue_token(&claims, &security.jwt_secret)?;

            match output_format {
                OutputFormat::Json => print_data(
                    &output_format,
                    "Token issued",
                    Some(&json!({ "token": token, "sub": claims.sub, "exp": claims.exp })),
                ),
                // Bare token so it can be captured with $(studio token issue ...)
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
