//! Terminal output shared by CLI commands.
//!
//! JSON mode prints machine-readable payloads only, so output can be piped
//! into `jq`.

use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a successful result under a one-line label
pub fn print_data(format: &OutputFormat, label: &str, data: Option<&Value>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data.unwrap_or(&Value::Null))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", label);
            if let Some(data) = data {
                println!("{}", serde_json::to_string_pretty(data)?);
            }
        }
    }
    Ok(())
}

/// Print a failure in the `{code, message}` shape the server uses
pub fn print_failure(format: &OutputFormat, code: &str, message: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "code": code, "message": message }))?);
        }
        OutputFormat::Text => eprintln!("✗ [{}] {}", code, message),
    }
    Ok(())
}
