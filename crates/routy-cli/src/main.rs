//! Routy CLI - Command line interface for the Routy daemon
//!
//! Every command talks to a running `routyd` over HTTP. Set
//! `ROUTY_DAEMON_URL` to reach a daemon other than the local default.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]
#![allow(clippy::too_many_lines)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use routy_core::util::load_env_file;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{agent, config, http, network, route, travel};

#[derive(Parser)]
#[command(name = "routy")]
#[command(author, version, about = "Routy - route planning and travel time CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize and inspect routes
    #[command(subcommand)]
    Route(route::RouteCommands),

    /// Travel time predictions
    #[command(subcommand)]
    Travel(travel::TravelCommands),

    /// Inspect and update the road network
    #[command(subcommand)]
    Network(network::NetworkCommands),

    /// Train and inspect the sequencing agent
    #[command(subcommand)]
    Agent(agent::AgentCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from routy.env file (before parsing args)
    load_env_file();

    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("routy={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Route(cmd) => route::run(cmd).await,
        Commands::Travel(cmd) => travel::run(cmd).await,
        Commands::Network(cmd) => network::run(cmd).await,
        Commands::Agent(cmd) => agent::run(cmd).await,
        Commands::Config(cmd) => config::run(cmd).await,
        Commands::Status => show_status().await,
    }
}

async fn show_status() -> Result<()> {
    println!("Routy Status");
    println!("============");
    println!("Daemon URL: {}", http::daemon_url());

    let health = match http::get(&http::endpoint("/health")).await {
        Ok(resp) if resp.status().is_success() => resp.json::<serde_json::Value>().await.ok(),
        _ => None,
    };
    let Some(health) = health else {
        println!("Daemon:     not running");
        return Ok(());
    };
    println!(
        "Daemon:     running (v{})",
        health["version"].as_str().unwrap_or("?")
    );

    if let Ok(resp) = http::get(&http::endpoint("/api/v1/agent/status")).await {
        if let Ok(status) = http::json_or_error(resp).await {
            println!(
                "Agent:      {} mode, {} training run(s)",
                status["agent"]["mode"].as_str().unwrap_or("?"),
                status["agent"]["training_runs"]
            );
            println!(
                "Traffic:    {}",
                status["traffic_source"].as_str().unwrap_or("?")
            );
        }
    }
    if let Ok(resp) = http::get(&http::endpoint("/api/v1/stats")).await {
        if let Ok(stats) = http::json_or_error(resp).await {
            println!("Routes:     {} optimized", stats["total_routes_optimized"]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "routy", "travel", "optimal", "Köln", "Frankfurt", "--window", "6",
        ])
        .unwrap();
        match cli.command {
            Commands::Travel(travel::TravelCommands::Optimal { window, latest, .. }) => {
                assert_eq!(window, 6);
                assert!(latest.is_none());
            }
            _ => panic!("expected travel optimal"),
        }
    }

    #[test]
    fn test_single_edge_traffic_needs_all_parts() {
        assert!(Cli::try_parse_from([
            "routy", "network", "traffic", "--start", "Berlin", "--end", "Hamburg",
        ])
        .is_err());

        assert!(Cli::try_parse_from([
            "routy", "network", "traffic", "--start", "Berlin", "--end", "Hamburg", "--delay",
            "0.4",
        ])
        .is_ok());

        assert!(Cli::try_parse_from(["routy", "network", "traffic"]).is_ok());
    }

    #[test]
    fn test_agent_train_collects_vehicles() {
        let cli = Cli::try_parse_from([
            "routy", "agent", "train", "-e", "5", "--vehicle", "van", "--vehicle", "truck",
        ])
        .unwrap();
        match cli.command {
            Commands::Agent(agent::AgentCommands::Train {
                episodes, vehicles, ..
            }) => {
                assert_eq!(episodes, Some(5));
                assert_eq!(vehicles, vec!["van", "truck"]);
            }
            _ => panic!("expected agent train"),
        }
    }
}
