//! Route commands.
//!
//! Submit a route and poll its token.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::client::{ApiClient, RouteStatus};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct SubmitArgs {
    /// Waypoints as `latitude,longitude`, in travel order
    #[arg(required = true, value_name = "LAT,LNG")]
    points: Vec<String>,

    /// Poll until the route finishes
    #[arg(short, long)]
    wait: bool,

    /// Polling interval in milliseconds (with --wait)
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Give up waiting after this many polls (with --wait)
    #[arg(long, default_value = "120")]
    max_polls: u32,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Token returned by `submit`
    token: String,
}

/// Split `lat,lng` into its two fields. Values are passed through unchanged.
pub fn parse_point(raw: &str) -> Result<[String; 2]> {
    let (lat, lng) = raw
        .split_once(',')
        .with_context(|| format!("point '{}' must be written as LAT,LNG", raw))?;
    let (lat, lng) = (lat.trim(), lng.trim());
    if lat.is_empty() || lng.is_empty() || lng.contains(',') {
        anyhow::bail!("point '{}' must be written as LAT,LNG", raw);
    }
    Ok([lat.to_string(), lng.to_string()])
}

pub async fn submit(args: SubmitArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let points = args
        .points
        .iter()
        .map(|p| parse_point(p))
        .collect::<Result<Vec<_>>>()?;

    let response = client.submit_route(&points).await?;
    let token = response.token.to_string();

    if !args.wait {
        match format {
            OutputFormat::Text => {
                output::print_success("Route accepted");
                output::print_detail("Token", &token);
            }
            _ => output::print_item(&response, format)?,
        }
        return Ok(());
    }

    if matches!(format, OutputFormat::Text) {
        output::print_info(&format!("Route accepted, token {}", token));
    }

    let interval = Duration::from_millis(args.interval_ms.max(1));
    for _ in 0..args.max_polls {
        let status = client.route_status(&token).await?;
        if status.is_terminal() {
            return print_status(&token, &status, format);
        }
        tokio::time::sleep(interval).await;
    }

    anyhow::bail!(
        "route {} still in progress after {} polls",
        token,
        args.max_polls
    )
}

pub async fn status(args: StatusArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.route_status(&args.token).await?;
    print_status(&args.token, &status, format)
}

fn print_status(token: &str, status: &RouteStatus, format: OutputFormat) -> Result<()> {
    if !matches!(format, OutputFormat::Text) {
        return output::print_item(status, format);
    }

    output::print_header("Route");
    output::print_detail("Token", token);
    match status {
        RouteStatus::InProgress => output::print_detail("Status", "in progress"),
        RouteStatus::Failure { error } => {
            output::print_detail("Status", "failure");
            output::print_error(error);
        }
        RouteStatus::Success {
            path,
            total_distance,
            total_time,
        } => {
            output::print_detail("Status", "success");
            let stops = path
                .iter()
                .map(|[lat, lng]| format!("{},{}", lat, lng))
                .collect::<Vec<_>>()
                .join(" -> ");
            output::print_detail("Path", &stops);
            output::print_detail("Distance", &format!("{} m", total_distance));
            output::print_detail("Time", &format!("{} s", total_time));
        }
    }
    Ok(())
}
