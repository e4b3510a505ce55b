//! Route optimization commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;

use routy_core::Order;

use super::http::{check_daemon, endpoint, get, json_or_error, post_json};

#[derive(Subcommand)]
pub enum RouteCommands {
    /// Optimize the stop order for a batch of orders
    Optimize {
        /// JSON file with an array of orders (or `{"orders": [...]}`)
        file: PathBuf,
    },
    /// Show a previously optimized route
    Show {
        /// Route ID returned by `routy route optimize`
        route_id: String,
    },
    /// Show route statistics
    Stats,
}

pub async fn run(cmd: RouteCommands) -> Result<()> {
    match cmd {
        RouteCommands::Optimize { file } => optimize(&file).await,
        RouteCommands::Show { route_id } => show(&route_id).await,
        RouteCommands::Stats => stats().await,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrdersFile {
    Bare(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

/// Read an orders file in either accepted layout
pub fn load_orders(path: &Path) -> Result<Vec<Order>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: OrdersFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of orders", path.display()))?;
    let orders = match parsed {
        OrdersFile::Bare(orders) | OrdersFile::Wrapped { orders } => orders,
    };
    if orders.is_empty() {
        anyhow::bail!("{} contains no orders", path.display());
    }
    Ok(orders)
}

async fn optimize(file: &Path) -> Result<()> {
    let orders = load_orders(file)?;
    check_daemon().await?;

    println!("Optimizing {} orders...", orders.len());
    let resp = post_json(&endpoint("/api/v1/route/optimize"), &json!({ "orders": orders }))
        .await
        .context("Failed to send optimize request")?;
    let plan = json_or_error(resp).await?;

    println!();
    println!("Route:    {}", plan["route_id"].as_str().unwrap_or("unknown"));
    println!("Orders:   {}", plan["total_orders"]);
    println!("Duration: ~{} min", plan["estimated_duration_minutes"]);
    println!();
    print_stops(&plan["stops"]);
    Ok(())
}

async fn show(route_id: &str) -> Result<()> {
    let resp = get(&endpoint(&format!("/api/v1/route/{route_id}")))
        .await
        .context("Failed to fetch route")?;
    let route = json_or_error(resp).await?;

    println!("Route:    {route_id}");
    println!("Status:   {}", route["status"].as_str().unwrap_or("unknown"));
    if let Some(position) = route["current_position"].as_str() {
        println!("Position: {position}");
    }
    println!();
    print_stops(&route["stops"]);
    Ok(())
}

async fn stats() -> Result<()> {
    let resp = get(&endpoint("/api/v1/stats"))
        .await
        .context("Failed to fetch stats")?;
    let stats = json_or_error(resp).await?;

    println!("Route Statistics");
    println!("================");
    println!("Routes optimized:   {}", stats["total_routes_optimized"]);
    println!("Orders processed:   {}", stats["total_orders_processed"]);
    println!(
        "Avg duration:       {:.1} min",
        stats["avg_duration_minutes"].as_f64().unwrap_or(0.0)
    );
    println!(
        "Avg stops / route:  {:.1}",
        stats["avg_stops_per_route"].as_f64().unwrap_or(0.0)
    );
    Ok(())
}

fn print_stops(stops: &serde_json::Value) {
    let Some(stops) = stops.as_array() else {
        println!("No stops");
        return;
    };
    for (i, stop) in stops.iter().enumerate() {
        println!("{:>3}. {}", i + 1, stop.as_str().unwrap_or("?"));
    }
}
