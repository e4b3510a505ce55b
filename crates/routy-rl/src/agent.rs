//! Sequencing agent - orders a batch of pickups and drop-offs into stops
//!
//! Two modes:
//! - **Heuristic**: stable sort by `(priority, id)`, visit each origin, end
//!   at the last order's destination.
//! - **Learned**: after training, the same order is walked through the road
//!   network so every intermediate location on the shortest paths becomes a
//!   stop, with edge weights refreshed from the live congestion signal first.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use routy_core::order::sort_by_urgency;
use routy_core::util::dedup_first_occurrence;
use routy_core::{CongestionSource, Location, Order, RoadNetwork, Result, RoutyError};

use crate::algorithm::TdLearner;
use crate::environment::Environment;
use crate::experience::Experience;
use crate::value::DEFAULT_HIDDEN_UNITS;

/// Learning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// When false, training records a fallback entry and prediction stays heuristic
    pub enabled: bool,
    pub epsilon: f64,
    pub discount: f64,
    pub max_steps_per_episode: u32,
    pub hidden_units: usize,
    /// Seed for weight init and exploration; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epsilon: 0.1,
            discount: 0.9,
            max_steps_per_episode: 100,
            hidden_units: DEFAULT_HIDDEN_UNITS,
            seed: None,
        }
    }
}

/// How `predict` builds a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Heuristic,
    Learned,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentMode::Heuristic => write!(f, "heuristic"),
            AgentMode::Learned => write!(f, "learned"),
        }
    }
}

/// Value model lifecycle. Dimensions are fixed once sized.
#[derive(Debug, Clone, Default)]
pub enum Policy {
    #[default]
    Unsized,
    /// Sized by a training call that ran no episodes
    Sized(TdLearner),
    Trained(TdLearner),
}

impl Policy {
    fn learner(&self) -> Option<&TdLearner> {
        match self {
            Policy::Unsized => None,
            Policy::Sized(l) | Policy::Trained(l) => Some(l),
        }
    }
}

/// Which training path produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    #[serde(rename = "dqn")]
    ValueLearning,
    #[serde(rename = "fallback")]
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Trained,
    TrainedStub,
}

/// One entry per training call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub episodes: u32,
    pub learning_rate: f64,
    pub status: TrainingStatus,
    pub avg_reward: f64,
    /// Nominal: `episodes * max_steps_per_episode`
    pub total_steps: u64,
    pub mode: TrainingMode,
}

/// Stop sequencer with an optional learned value model
pub struct SequencingAgent {
    config: AgentConfig,
    policy: Policy,
    history: Vec<TrainingRecord>,
}

impl SequencingAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            policy: Policy::Unsized,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn mode(&self) -> AgentMode {
        match self.policy {
            Policy::Trained(_) if self.config.enabled => AgentMode::Learned,
            _ => AgentMode::Heuristic,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.policy, Policy::Trained(_))
    }

    /// `(inputs, outputs)` of the value model once sized
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.policy.learner().map(TdLearner::dimensions)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Value model parameters, `Null` before the first training call
    pub fn model_params(&self) -> serde_json::Value {
        self.policy
            .learner()
            .map_or(serde_json::Value::Null, TdLearner::get_params)
    }

    pub fn history(&self) -> &[TrainingRecord] {
        &self.history
    }

    /// Ordered stop list for a batch of orders
    pub fn predict(
        &mut self,
        network: &mut RoadNetwork,
        source: &dyn CongestionSource,
        orders: &[Order],
    ) -> Vec<Location> {
        if orders.is_empty() {
            return Vec::new();
        }
        match self.mode() {
            AgentMode::Heuristic => heuristic_route(orders),
            AgentMode::Learned => learned_route(network, source, orders),
        }
    }

    /// Train the value model against `env`. Each call appends one record to
    /// the history.
    pub fn train<E: Environment>(
        &mut self,
        env: &mut E,
        episodes: u32,
        learning_rate: f64,
    ) -> Result<TrainingRecord> {
        let total_steps = u64::from(episodes) * u64::from(self.config.max_steps_per_episode);

        if !self.config.enabled {
            warn!("Learning disabled, recording fallback training entry");
            return Ok(self.record(TrainingRecord {
                run_id: Uuid::new_v4(),
                trained_at: Utc::now(),
                episodes,
                learning_rate,
                status: TrainingStatus::TrainedStub,
                avg_reward: 0.0,
                total_steps,
                mode: TrainingMode::Fallback,
            }));
        }

        let actions = env.possible_actions();
        if actions.is_empty() {
            return Err(RoutyError::InvalidInput(
                "environment exposes no actions".to_string(),
            ));
        }

        let inputs = env.reset().to_features().len();
        let outputs = actions.len();
        let mut learner = self.take_learner(inputs, outputs)?;

        let mut returns = Vec::with_capacity(episodes as usize);
        for episode in 0..episodes {
            let mut features = env.reset().to_features();
            let mut episode_return = 0.0;

            for _ in 0..self.config.max_steps_per_episode {
                let action = learner.select_action(&features);
                let outcome = env.step(&actions[action]);
                let next_features = outcome.state.to_features();

                let experience = Experience::new(
                    features,
                    action,
                    outcome.reward,
                    next_features.clone(),
                    outcome.done,
                );
                learner.td_update(&experience, learning_rate);

                episode_return += outcome.reward;
                features = next_features;
                if outcome.done {
                    break;
                }
            }

            debug!("Episode {} return {:.2}", episode, episode_return);
            returns.push(episode_return);
        }

        let avg_reward = if returns.is_empty() {
            0.0
        } else {
            returns.iter().sum::<f64>() / returns.len() as f64
        };

        self.policy = if episodes > 0 {
            Policy::Trained(learner)
        } else {
            Policy::Sized(learner)
        };

        info!(
            "Training complete: {} episodes, avg reward {:.3}, lr {}",
            episodes, avg_reward, learning_rate
        );

        Ok(self.record(TrainingRecord {
            run_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            episodes,
            learning_rate,
            status: TrainingStatus::Trained,
            avg_reward,
            total_steps,
            mode: TrainingMode::ValueLearning,
        }))
    }

    /// Take the current learner out of the policy, creating it on first use.
    /// The policy is left untouched on a dimension mismatch.
    fn take_learner(&mut self, inputs: usize, outputs: usize) -> Result<TdLearner> {
        if let Some(existing) = self.policy.learner() {
            let (expected_inputs, expected_outputs) = existing.dimensions();
            if (expected_inputs, expected_outputs) != (inputs, outputs) {
                return Err(RoutyError::DimensionMismatch {
                    expected_inputs,
                    expected_outputs,
                    actual_inputs: inputs,
                    actual_outputs: outputs,
                });
            }
        }

        match std::mem::take(&mut self.policy) {
            Policy::Sized(l) | Policy::Trained(l) => Ok(l),
            Policy::Unsized => {
                info!(
                    "Sizing value model: {} inputs, {} actions",
                    inputs, outputs
                );
                let rng = match self.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Ok(TdLearner::new(
                    inputs,
                    self.config.hidden_units,
                    outputs,
                    self.config.epsilon,
                    self.config.discount,
                    rng,
                ))
            }
        }
    }

    fn record(&mut self, record: TrainingRecord) -> TrainingRecord {
        self.history.push(record.clone());
        record
    }
}

impl Default for SequencingAgent {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

/// Origins in urgency order, then the last order's destination
pub fn heuristic_route(orders: &[Order]) -> Vec<Location> {
    let sorted = sort_by_urgency(orders);
    let mut stops: Vec<Location> = sorted.iter().map(|o| o.origin.clone()).collect();
    if let Some(last) = sorted.last() {
        stops.push(last.destination.clone());
    }
    dedup_first_occurrence(stops)
}

/// Urgency-ordered walk through the network, expanding shortest paths
pub fn learned_route(
    network: &mut RoadNetwork,
    source: &dyn CongestionSource,
    orders: &[Order],
) -> Vec<Location> {
    let sorted = sort_by_urgency(orders);

    let locations = dedup_first_occurrence(
        sorted
            .iter()
            .flat_map(|o| [o.origin.clone(), o.destination.clone()])
            .collect(),
    );
    for location in &locations {
        network.add_location(location.as_str());
    }
    refresh_batch_traffic(network, source, &locations);

    let mut stops: Vec<Location> = Vec::new();
    let mut current: Option<&str> = None;
    for order in &sorted {
        match current {
            Some(from) => extend_with_path(network, &mut stops, from, &order.origin),
            None => stops.push(order.origin.clone()),
        }
        extend_with_path(network, &mut stops, &order.origin, &order.destination);
        current = Some(&order.destination);
    }

    dedup_first_occurrence(stops)
}

/// Apply one congestion reading to every edge between batch locations
fn refresh_batch_traffic(
    network: &mut RoadNetwork,
    source: &dyn CongestionSource,
    locations: &[Location],
) {
    let delay = source.current_delay();
    debug!(
        "Refreshing traffic between {} batch locations from {} (delay {:.2})",
        locations.len(),
        source.name(),
        delay
    );
    for (i, a) in locations.iter().enumerate() {
        for b in &locations[i + 1..] {
            network.update_traffic(a, b, delay);
        }
    }
}

/// Append the path `from -> to` without `from`; just `to` when unreachable
fn extend_with_path(network: &RoadNetwork, stops: &mut Vec<Location>, from: &str, to: &str) {
    match network.shortest_path(from, to) {
        Some(path) => stops.extend(path.into_iter().skip(1)),
        None => stops.push(to.to_string()),
    }
}
