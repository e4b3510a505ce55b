//! Road network commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use super::http::{endpoint, get, get_query, json_or_error, post_json};

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// List all road segments
    Edges,
    /// List segments at or above a delay factor
    Congested {
        #[arg(short, long, default_value = "0.5")]
        threshold: f64,
    },
    /// Shortest path between two locations
    Path { start: String, end: String },
    /// Add or replace a road segment
    AddEdge {
        start: String,
        end: String,
        /// Free-flow travel time in minutes
        minutes: f64,
    },
    /// Update traffic: one segment with --start/--end/--delay, or all from the live feed
    Traffic {
        #[arg(long, requires_all = ["end", "delay"])]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
        #[arg(long, requires = "start")]
        delay: Option<f64>,
    },
}

pub async fn run(cmd: NetworkCommands) -> Result<()> {
    match cmd {
        NetworkCommands::Edges => edges().await,
        NetworkCommands::Congested { threshold } => congested(threshold).await,
        NetworkCommands::Path { start, end } => path(&start, &end).await,
        NetworkCommands::AddEdge {
            start,
            end,
            minutes,
        } => add_edge(&start, &end, minutes).await,
        NetworkCommands::Traffic { start, end, delay } => traffic(start, end, delay).await,
    }
}

async fn edges() -> Result<()> {
    let resp = get(&endpoint("/api/v1/network/edges"))
        .await
        .context("Failed to fetch edges")?;
    let result = json_or_error(resp).await?;

    print_edges(&result["edges"]);
    println!("\n{} segments", result["count"]);
    Ok(())
}

async fn congested(threshold: f64) -> Result<()> {
    let resp = get_query(
        &endpoint("/api/v1/network/congested"),
        &[("threshold", threshold)],
    )
    .await
    .context("Failed to fetch congested segments")?;
    let result = json_or_error(resp).await?;

    if result["count"] == 0 {
        println!("No segments at or above delay {threshold:.2}");
        return Ok(());
    }
    print_edges(&result["edges"]);
    Ok(())
}

async fn path(start: &str, end: &str) -> Result<()> {
    let resp = get_query(
        &endpoint("/api/v1/network/path"),
        &[("start", start), ("end", end)],
    )
    .await
    .context("Failed to fetch path")?;
    let result = json_or_error(resp).await?;

    let hops: Vec<&str> = result["path"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    println!("{}", hops.join(" -> "));
    println!(
        "{:.1} min",
        result["total_minutes"].as_f64().unwrap_or(0.0)
    );
    Ok(())
}

async fn add_edge(start: &str, end: &str, minutes: f64) -> Result<()> {
    let body = json!({ "start": start, "end": end, "travel_time": minutes });
    let resp = post_json(&endpoint("/api/v1/network/edges"), &body)
        .await
        .context("Failed to add edge")?;
    json_or_error(resp).await?;

    println!("Segment {start} <-> {end} set to {minutes:.1} min");
    Ok(())
}

async fn traffic(start: Option<String>, end: Option<String>, delay: Option<f64>) -> Result<()> {
    let body = json!({ "start": start, "end": end, "delay_factor": delay });
    let resp = post_json(&endpoint("/api/v1/network/traffic"), &body)
        .await
        .context("Failed to update traffic")?;
    let result = json_or_error(resp).await?;

    println!(
        "Updated {} segment(s) from {} with delay {:.2}",
        result["updated_edges"],
        result["source"].as_str().unwrap_or("?"),
        result["delay_factor"].as_f64().unwrap_or(0.0)
    );
    Ok(())
}

fn print_edges(edges: &Value) {
    println!(
        "{:<14} {:<14} {:>8} {:>8} {:>6}",
        "START", "END", "BASE", "WEIGHT", "DELAY"
    );
    println!("{}", "-".repeat(54));
    for edge in edges.as_array().into_iter().flatten() {
        println!(
            "{:<14} {:<14} {:>8.1} {:>8.1} {:>6.2}",
            edge["start"].as_str().unwrap_or("?"),
            edge["end"].as_str().unwrap_or("?"),
            edge["base_weight"].as_f64().unwrap_or(0.0),
            edge["weight"].as_f64().unwrap_or(0.0),
            edge["delay_factor"].as_f64().unwrap_or(0.0),
        );
    }
}
