//! Configuration loading for Routy Daemon

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use routy_forecast::ForecastConfig;
use routy_rl::AgentConfig;

/// Configuration for the daemon
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub traffic: TrafficConfig,
    pub network: NetworkConfig,
    pub forecast: ForecastConfig,
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind_address: String,
    pub log_level: String,
    pub allowed_origins: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            log_level: "info".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// Live congestion feed
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://verkehr.autobahn.de/o/autobahn/".to_string(),
            timeout_seconds: 5,
        }
    }
}

/// Extra road segment loaded at startup
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EdgeConfig {
    pub start: String,
    pub end: String,
    /// Free-flow minutes
    pub travel_time: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Start from the built-in city network
    pub seed_default: bool,
    pub edges: Vec<EdgeConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            seed_default: true,
            edges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub learning_rate: f64,
    pub episodes: u32,
    pub epsilon: f64,
    pub discount: f64,
    pub max_steps_per_episode: u32,
    /// Upper bound for `episodes` in a single training request
    pub max_episodes: u32,
    pub seed: Option<u64>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_rate: 0.01,
            episodes: 100,
            epsilon: 0.1,
            discount: 0.9,
            max_steps_per_episode: 100,
            max_episodes: 1000,
            seed: None,
        }
    }
}

impl LearningConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            enabled: self.enabled,
            epsilon: self.epsilon,
            discount: self.discount,
            max_steps_per_episode: self.max_steps_per_episode,
            seed: self.seed,
            ..AgentConfig::default()
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_file().as_deref())
    }

    /// Load configuration from an explicit file (if any) and environment
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        // Add config file if it exists
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        } else {
            tracing::info!("No config file found, using defaults");
        }

        // Add environment variables with ROUTY_ prefix
        builder = builder.add_source(
            Environment::with_prefix("ROUTY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: ROUTY_CONFIG env, ./routy.toml, ~/.config/routy/routy.toml
        if let Ok(path) = std::env::var("ROUTY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("routy.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("routy").join("routy.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}
