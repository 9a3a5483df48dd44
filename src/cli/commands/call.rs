use clap::Args;
use serde_json::{json, Value};
use std::time::Duration;

use crate::cli::utils::{print_data, print_failure};
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct CallArgs {
    #[arg(help = "Dotted procedure path, e.g. investor.getById")]
    pub path: String,

    #[arg(long, short, help = "Procedure input as JSON")]
    pub input: Option<String>,

    #[arg(long, help = "Send as a mutation (POST) instead of a query (GET)")]
    pub mutation: bool,

    #[arg(long, env = "STUDIO_TOKEN", help = "Session token for protected procedures")]
    pub token: Option<String>,

    #[arg(long, env = "STUDIO_TRPC_PREFIX", default_value = "/api/trpc", help = "Procedure endpoint prefix")]
    pub prefix: String,
}

/// Wrap a plain JSON input in the wire envelope
pub fn envelope(input: Option<&str>) -> anyhow::Result<Value> {
    let json = match input {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| anyhow::anyhow!("--input is not valid JSON: {}", e))?,
        None => Value::Null,
    };
    Ok(json!({ "json": json }))
}

pub async fn handle(server: &str, args: CallArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}{}/{}", server, args.prefix.trim_end_matches('/'), args.path);
    let body = envelope(args.input.as_deref())?;

    let mut request = if args.mutation {
        client.post(&url).json(&body)
    } else {
        client.get(&url).query(&[("input", body.to_string())])
    };
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }

    tracing::debug!("Calling {} ({})", url, if args.mutation { "POST" } else { "GET" });
    let response = request.timeout(Duration::from_secs(30)).send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;

    if let Some(data) = payload.pointer("/result/data/json") {
        return print_data(&output_format, &format!("{} ({})", args.path, status), Some(data));
    }

    let error = payload.pointer("/error/json").cloned().unwrap_or(payload);
    let code = error.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
    let message = error.get("message").and_then(Value::as_str).unwrap_or("Unexpected response");
    print_failure(&output_format, code, message)?;
    anyhow::bail!("{} failed with {}", args.path, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_input_in_envelope() {
        assert_eq!(envelope(Some(r#"{"id":"x"}"#)).unwrap(), json!({ "json": { "id": "x" } }));
        assert_eq!(envelope(None).unwrap(), json!({ "json": null }));
        assert!(envelope(Some("{oops")).is_err());
    }
}
