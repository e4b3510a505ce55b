//! Sequencing agent commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::json;

use super::http::{check_daemon, endpoint, get, json_or_error, post_json};
use super::route::load_orders;

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Train the value model on a tour environment
    Train {
        /// Episodes to run (daemon default when omitted)
        #[arg(short, long)]
        episodes: Option<u32>,

        /// Learning rate (daemon default when omitted)
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Orders JSON file to train on (demo batch when omitted)
        #[arg(short, long)]
        orders: Option<PathBuf>,

        /// Vehicle ids to assign orders to
        #[arg(long = "vehicle")]
        vehicles: Vec<String>,
    },
    /// List previous training runs
    History,
    /// Show the agent mode and model shape
    Status,
}

pub async fn run(cmd: AgentCommands) -> Result<()> {
    match cmd {
        AgentCommands::Train {
            episodes,
            learning_rate,
            orders,
            vehicles,
        } => train(episodes, learning_rate, orders, vehicles).await,
        AgentCommands::History => history().await,
        AgentCommands::Status => status().await,
    }
}

async fn train(
    episodes: Option<u32>,
    learning_rate: Option<f64>,
    orders: Option<PathBuf>,
    vehicles: Vec<String>,
) -> Result<()> {
    let orders = orders.as_deref().map(load_orders).transpose()?;
    check_daemon().await?;

    let vehicles: Vec<_> = vehicles
        .iter()
        .map(|id| json!({ "vehicle_id": id }))
        .collect();
    let body = json!({
        "episodes": episodes,
        "learning_rate": learning_rate,
        "orders": orders,
        "vehicles": vehicles,
    });

    println!("Training...");
    let resp = post_json(&endpoint("/api/v1/agent/train"), &body)
        .await
        .context("Failed to send training request")?;
    let record = json_or_error(resp).await?;

    println!("Run:        {}", record["run_id"].as_str().unwrap_or("?"));
    println!("Mode:       {}", record["mode"].as_str().unwrap_or("?"));
    println!("Status:     {}", record["status"].as_str().unwrap_or("?"));
    println!("Episodes:   {}", record["episodes"]);
    println!(
        "Avg reward: {:.3}",
        record["avg_reward"].as_f64().unwrap_or(0.0)
    );
    Ok(())
}

async fn history() -> Result<()> {
    let resp = get(&endpoint("/api/v1/agent/history"))
        .await
        .context("Failed to fetch training history")?;
    let result = json_or_error(resp).await?;

    let runs = result["history"].as_array().cloned().unwrap_or_default();
    if runs.is_empty() {
        println!("No training runs yet");
        return Ok(());
    }

    println!(
        "{:<10} {:<26} {:>8} {:>8} {:>10}  MODE",
        "RUN", "TRAINED AT", "EPISODES", "LR", "REWARD"
    );
    println!("{}", "-".repeat(76));
    for run in &runs {
        let run_id = run["run_id"].as_str().unwrap_or("?");
        println!(
            "{:<10} {:<26} {:>8} {:>8} {:>10.3}  {}",
            &run_id[..8.min(run_id.len())],
            run["trained_at"].as_str().unwrap_or("?"),
            run["episodes"],
            run["learning_rate"],
            run["avg_reward"].as_f64().unwrap_or(0.0),
            run["mode"].as_str().unwrap_or("?"),
        );
    }
    Ok(())
}

async fn status() -> Result<()> {
    let resp = get(&endpoint("/api/v1/agent/status"))
        .await
        .context("Failed to fetch agent status")?;
    let result = json_or_error(resp).await?;
    let agent = &result["agent"];

    println!("Mode:           {}", agent["mode"].as_str().unwrap_or("?"));
    println!("Trained:        {}", agent["trained"]);
    println!("Learning:       {}", agent["learning_enabled"]);
    println!("Training runs:  {}", agent["training_runs"]);
    if let (Some(inputs), Some(outputs)) = (agent["input_dim"].as_u64(), agent["output_dim"].as_u64()) {
        println!("Model shape:    {inputs} inputs -> {outputs} actions");
    }
    println!(
        "Traffic source: {}",
        result["traffic_source"].as_str().unwrap_or("?")
    );
    Ok(())
}
