//! Health check command.
//!
//! Queries the `/health` endpoint and displays store and pool status.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Include job pool statistics
    #[arg(short, long)]
    detailed: bool,
}

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    if !matches!(format, OutputFormat::Text) {
        return output::print_item(&health, format);
    }

    let field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or("unknown").to_string();
    let status = field(&health, "status");

    output::print_header("Service Health");
    output::print_detail("Status", &status);
    output::print_detail("API URL", client.base_url());
    output::print_detail("Version", &field(&health, "version"));

    if let Some(store) = health.get("store") {
        output::print_detail(
            "Store",
            &format!("{} ({})", field(store, "backend"), field(store, "status")),
        );
    }

    if args.detailed {
        if let Some(pool) = health.get("pool").and_then(Value::as_object) {
            output::print_header("Job Pool");
            for (key, value) in pool {
                output::print_detail(key, &value.to_string());
            }
        }
    }

    if status == "healthy" {
        output::print_success("Service operational");
    } else {
        output::print_error(&format!("Service status: {}", status));
    }
    Ok(())
}
