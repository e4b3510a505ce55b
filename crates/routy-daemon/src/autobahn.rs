//! Autobahn traffic feed as a live congestion source
//!
//! The feed lists current disruptions. The delay factor is the number of
//! reported entries scaled so that 50 or more means fully congested.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use routy_core::congestion::clamp_delay;
use routy_core::{CongestionSource, NEUTRAL_DELAY};

use crate::config::TrafficConfig;

/// Entry count treated as full congestion
pub const SATURATION_EVENTS: f64 = 50.0;

/// Feed sections counted as disruptions
const EVENT_SECTIONS: &[&str] = &["roadworks", "warning", "closure", "events"];

#[derive(Debug, Clone)]
pub struct AutobahnClient {
    url: String,
    client: reqwest::blocking::Client,
}

impl AutobahnClient {
    pub fn new(config: &TrafficConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<FeedResponse, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<FeedResponse>())
    }
}

impl CongestionSource for AutobahnClient {
    fn current_delay(&self) -> f64 {
        match self.fetch() {
            Ok(feed) => {
                let count = feed.event_count();
                let delay = clamp_delay(count as f64 / SATURATION_EVENTS);
                debug!("Traffic feed: {} events, delay factor {:.2}", count, delay);
                delay
            }
            Err(e) => {
                warn!("Traffic feed unavailable ({}), using neutral delay", e);
                NEUTRAL_DELAY
            }
        }
    }

    fn name(&self) -> &str {
        "autobahn"
    }
}

/// Any JSON document; only the disruption arrays are inspected
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct FeedResponse(Value);

impl FeedResponse {
    fn event_count(&self) -> usize {
        EVENT_SECTIONS
            .iter()
            .filter_map(|key| self.0.get(key).and_then(Value::as_array))
            .map(Vec::len)
            .sum()
    }
}
