//! Travel time commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use super::http::{endpoint, get_query, json_or_error, post_json};

#[derive(Subcommand)]
pub enum TravelCommands {
    /// Predict the travel time between two locations
    Predict {
        start: String,
        end: String,

        /// Departure time (ISO-8601, default: now)
        #[arg(short, long)]
        departure: Option<String>,
    },
    /// Find the best departure within a window
    Optimal {
        start: String,
        end: String,

        /// Earliest departure (ISO-8601, default: now)
        #[arg(long)]
        earliest: Option<String>,

        /// Latest acceptable arrival (ISO-8601)
        #[arg(long)]
        latest: Option<String>,

        /// Hours to search
        #[arg(short, long, default_value = "12")]
        window: u32,
    },
    /// Hourly forecast from now
    Forecast {
        start: String,
        end: String,

        /// Number of hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    /// Current traffic on a route
    Traffic { start: String, end: String },
}

pub async fn run(cmd: TravelCommands) -> Result<()> {
    match cmd {
        TravelCommands::Predict {
            start,
            end,
            departure,
        } => predict(&start, &end, departure).await,
        TravelCommands::Optimal {
            start,
            end,
            earliest,
            latest,
            window,
        } => optimal(&start, &end, earliest, latest, window).await,
        TravelCommands::Forecast { start, end, hours } => forecast(&start, &end, hours).await,
        TravelCommands::Traffic { start, end } => traffic(&start, &end).await,
    }
}

async fn predict(start: &str, end: &str, departure: Option<String>) -> Result<()> {
    let body = json!({
        "start": start,
        "end": end,
        "departure_time": departure,
    });
    let resp = post_json(&endpoint("/api/v1/travel/predict"), &body)
        .await
        .context("Failed to send prediction request")?;
    let prediction = json_or_error(resp).await?;

    println!("{start} -> {end}");
    print_prediction(&prediction);
    Ok(())
}

async fn optimal(
    start: &str,
    end: &str,
    earliest: Option<String>,
    latest: Option<String>,
    window: u32,
) -> Result<()> {
    let body = json!({
        "start": start,
        "end": end,
        "earliest_departure": earliest,
        "latest_arrival": latest,
        "hours_window": window,
    });
    let resp = post_json(&endpoint("/api/v1/travel/optimal-departure"), &body)
        .await
        .context("Failed to send departure search")?;
    let result = json_or_error(resp).await?;

    println!(
        "Analyzed {} departures over {} hours\n",
        result["total_options_analyzed"], result["search_window_hours"]
    );
    println!("Recommended:");
    print_option(&result["recommendation"]);

    if let Some(alternatives) = result["alternatives"].as_array() {
        if !alternatives.is_empty() {
            println!("\nAlternatives:");
            for alt in alternatives {
                print_option(alt);
            }
        }
    }
    Ok(())
}

async fn forecast(start: &str, end: &str, hours: u32) -> Result<()> {
    let resp = get_query(
        &endpoint("/api/v1/travel/forecast"),
        &[
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("hours", hours.to_string()),
        ],
    )
    .await
    .context("Failed to fetch forecast")?;
    let result = json_or_error(resp).await?;

    println!("{start} -> {end}, next {hours} hours\n");
    println!("{:<20} {:>10} {:>10}  TRAFFIC", "DEPARTURE", "MINUTES", "DELAY");
    println!("{}", "-".repeat(56));
    for entry in result["forecast"].as_array().into_iter().flatten() {
        println!(
            "{:<20} {:>10.1} {:>10.1}  {}",
            entry["departure_time"].as_str().unwrap_or("?"),
            entry["predicted_minutes"].as_f64().unwrap_or(0.0),
            entry["delay_minutes"].as_f64().unwrap_or(0.0),
            entry["traffic_level"].as_str().unwrap_or("?"),
        );
    }
    Ok(())
}

async fn traffic(start: &str, end: &str) -> Result<()> {
    let resp = get_query(
        &endpoint("/api/v1/travel/traffic"),
        &[("start", start), ("end", end)],
    )
    .await
    .context("Failed to fetch traffic")?;
    let info = json_or_error(resp).await?;

    println!("{start} -> {end}");
    println!("Status: {}", info["traffic_status"].as_str().unwrap_or("unknown"));
    println!(
        "Delay:  {:.2} (~{} min)",
        info["delay_factor"].as_f64().unwrap_or(0.0),
        info["estimated_delay_minutes"]
    );
    Ok(())
}

fn print_prediction(prediction: &Value) {
    println!(
        "Departure: {}",
        prediction["departure_time"].as_str().unwrap_or("?")
    );
    println!(
        "Travel:    {:.1} min (free flow {:.1}, +{:.1})",
        prediction["predicted_minutes"].as_f64().unwrap_or(0.0),
        prediction["base_minutes"].as_f64().unwrap_or(0.0),
        prediction["delay_minutes"].as_f64().unwrap_or(0.0),
    );
    println!(
        "Traffic:   {} (confidence {:.1})",
        prediction["traffic_level"].as_str().unwrap_or("?"),
        prediction["confidence"].as_f64().unwrap_or(0.0)
    );
}

fn print_option(option: &Value) {
    let marker = if option["valid"].as_bool().unwrap_or(false) {
        ""
    } else {
        "  (misses arrival)"
    };
    println!(
        "  depart {}  arrive {}  {:.1} min{}",
        option["departure_time"].as_str().unwrap_or("?"),
        option["arrival_time"].as_str().unwrap_or("?"),
        option["predicted_minutes"].as_f64().unwrap_or(0.0),
        marker
    );
}
