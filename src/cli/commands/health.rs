use serde_json::Value;
use std::time::Duration;

use crate::cli::utils::{print_data, print_failure};
use crate::cli::OutputFormat;

pub async fn handle(server: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server);

    let response = client.get(&url).timeout(Duration::from_secs(5)).send().await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        print_data(&output_format, &format!("{} is healthy", server), body.get("data"))
    } else {
        print_failure(&output_format, "UNHEALTHY", &format!("{} is degraded ({})", server, status))?;
        anyhow::bail!("health check failed with status {}", status)
    }
}
