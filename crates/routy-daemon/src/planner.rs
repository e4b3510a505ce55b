//! Planner - owns the road network, forecaster and sequencing agent
//!
//! Every API operation goes through one `Planner` value. The daemon keeps it
//! behind a single lock and calls it from blocking tasks, so the methods here
//! are plain synchronous code and may block on the congestion source.

use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use routy_core::{
    CongestionSource, EdgeInfo, Location, NoCongestion, Order, RoadNetwork, RoutePlan, Result,
    RoutyError, Vehicle,
};
use routy_forecast::{
    DepartureQuery, OptimalDeparture, TrafficInfo, TravelTimePrediction, TravelTimePredictor,
};
use routy_rl::{AgentMode, SequencingAgent, TourEnvironment, TrainingRecord};

use crate::autobahn::AutobahnClient;
use crate::config::{Config, LearningConfig};

/// Aggregates over the plans served since startup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlannerStats {
    pub total_routes_optimized: u64,
    pub avg_duration_minutes: f64,
    pub total_orders_processed: u64,
    pub avg_stops_per_route: f64,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    routes: u64,
    orders: u64,
    stops: u64,
    duration_minutes: u64,
}

/// Shortest path between two locations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathInfo {
    pub start: Location,
    pub end: Location,
    pub path: Vec<Location>,
    pub total_minutes: f64,
}

/// Agent state reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub mode: AgentMode,
    pub trained: bool,
    pub learning_enabled: bool,
    pub input_dim: Option<usize>,
    pub output_dim: Option<usize>,
    pub training_runs: usize,
    pub model: serde_json::Value,
}

pub struct Planner {
    network: RoadNetwork,
    predictor: TravelTimePredictor,
    agent: SequencingAgent,
    source: Box<dyn CongestionSource>,
    learning: LearningConfig,
    routes: HashMap<String, RoutePlan>,
    counters: Counters,
}

impl Planner {
    pub fn new(
        network: RoadNetwork,
        predictor: TravelTimePredictor,
        agent: SequencingAgent,
        source: Box<dyn CongestionSource>,
        learning: LearningConfig,
    ) -> Self {
        Self {
            network,
            predictor,
            agent,
            source,
            learning,
            routes: HashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Build the planner described by `config`. Constructs a blocking HTTP
    /// client when live traffic is enabled, so call it off the async runtime.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source: Box<dyn CongestionSource> = if config.traffic.enabled {
            let client = AutobahnClient::new(&config.traffic)
                .context("Failed to build traffic feed client")?;
            info!("Live traffic from {}", client.url());
            Box::new(client)
        } else {
            info!("Live traffic disabled");
            Box::new(NoCongestion)
        };
        Self::with_source(config, source)
    }

    /// Build from `config` with an explicit congestion source
    pub fn with_source(
        config: &Config,
        source: Box<dyn CongestionSource>,
    ) -> anyhow::Result<Self> {
        let mut network = if config.network.seed_default {
            RoadNetwork::with_default_network()
        } else {
            RoadNetwork::empty()
        };
        for edge in &config.network.edges {
            network
                .add_edge(edge.start.as_str(), edge.end.as_str(), edge.travel_time)
                .with_context(|| format!("Invalid edge {} <-> {}", edge.start, edge.end))?;
        }
        info!(
            "Road network ready: {} locations, {} edges",
            network.location_count(),
            network.edge_count()
        );

        Ok(Self::new(
            network,
            TravelTimePredictor::new(config.forecast.clone()),
            SequencingAgent::new(config.learning.agent_config()),
            source,
            config.learning.clone(),
        ))
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn agent(&self) -> &SequencingAgent {
        &self.agent
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    // ---- routing ----

    pub fn optimize_route(&mut self, orders: &[Order]) -> Result<RoutePlan> {
        validate_batch(orders)?;

        let stops = self
            .agent
            .predict(&mut self.network, self.source.as_ref(), orders);
        let plan = RoutePlan::from_stops(orders, stops);

        self.counters.routes += 1;
        self.counters.orders += orders.len() as u64;
        self.counters.stops += plan.stops.len() as u64;
        self.counters.duration_minutes += u64::from(plan.estimated_duration_minutes);
        self.routes.insert(plan.route_id.clone(), plan.clone());

        info!(
            "Optimized {} ({} orders, {} stops, {} mode)",
            plan.route_id,
            plan.total_orders,
            plan.stops.len(),
            self.agent.mode()
        );
        Ok(plan)
    }

    pub fn route(&self, route_id: &str) -> Result<RoutePlan> {
        self.routes
            .get(route_id)
            .cloned()
            .ok_or_else(|| RoutyError::NotFound(format!("route {route_id}")))
    }

    pub fn stats(&self) -> PlannerStats {
        let c = &self.counters;
        let per_route = |total: u64| {
            if c.routes == 0 {
                0.0
            } else {
                total as f64 / c.routes as f64
            }
        };
        PlannerStats {
            total_routes_optimized: c.routes,
            avg_duration_minutes: per_route(c.duration_minutes),
            total_orders_processed: c.orders,
            avg_stops_per_route: per_route(c.stops),
        }
    }

    // ---- travel time ----

    pub fn predict_travel(
        &mut self,
        origin: &str,
        destination: &str,
        departure: Option<NaiveDateTime>,
    ) -> Result<TravelTimePrediction> {
        let departure = departure.unwrap_or_else(|| self.predictor.now());
        self.predictor.predict(
            &self.network,
            self.source.as_ref(),
            origin,
            destination,
            departure,
        )
    }

    pub fn optimal_departure(&mut self, query: &DepartureQuery) -> Result<OptimalDeparture> {
        self.predictor
            .find_optimal_departure(&self.network, self.source.as_ref(), query)
    }

    pub fn hourly_forecast(
        &mut self,
        origin: &str,
        destination: &str,
        hours: u32,
    ) -> Result<Vec<TravelTimePrediction>> {
        // Unknown endpoints would otherwise yield an empty forecast
        self.require_locations(origin, destination)?;
        self.predictor.hourly_forecast(
            &self.network,
            self.source.as_ref(),
            origin,
            destination,
            hours,
        )
    }

    pub fn traffic_info(&self, origin: &str, destination: &str) -> TrafficInfo {
        self.predictor
            .traffic_info(self.source.as_ref(), origin, destination)
    }

    // ---- network ----

    pub fn edges(&self) -> Vec<EdgeInfo> {
        self.network.get_all_edges()
    }

    pub fn congested(&self, threshold: f64) -> Vec<EdgeInfo> {
        self.network.get_congested_routes(threshold)
    }

    pub fn path(&self, start: &str, end: &str) -> Result<PathInfo> {
        self.require_locations(start, end)?;
        let no_path = || RoutyError::NoPath {
            from: start.to_string(),
            to: end.to_string(),
        };
        let path = self.network.shortest_path(start, end).ok_or_else(no_path)?;
        let total_minutes = self
            .network
            .shortest_path_length(start, end)
            .ok_or_else(no_path)?;
        Ok(PathInfo {
            start: start.to_string(),
            end: end.to_string(),
            path,
            total_minutes,
        })
    }

    pub fn add_edge(&mut self, start: &str, end: &str, minutes: f64) -> Result<EdgeInfo> {
        self.network.add_edge(start, end, minutes)?;
        self.edge(start, end)
    }

    /// Set one edge's delay factor
    pub fn set_edge_traffic(&mut self, start: &str, end: &str, delay: f64) -> Result<EdgeInfo> {
        if !self.network.has_edge(start, end) {
            return Err(RoutyError::NotFound(format!("edge {start} <-> {end}")));
        }
        self.network.update_traffic(start, end, delay);
        self.edge(start, end)
    }

    /// Apply one live reading to every edge. Returns the delay applied.
    pub fn refresh_traffic(&mut self) -> f64 {
        let delay = self.source.current_delay();
        self.network.update_all_traffic(delay);
        info!(
            "Applied live delay {:.2} from {} to {} edges",
            delay,
            self.source.name(),
            self.network.edge_count()
        );
        delay
    }

    fn require_locations(&self, start: &str, end: &str) -> Result<()> {
        for location in [start, end] {
            if !self.network.has_location(location) {
                return Err(RoutyError::NotFound(format!("location {location}")));
            }
        }
        Ok(())
    }

    fn edge(&self, start: &str, end: &str) -> Result<EdgeInfo> {
        self.network
            .get_all_edges()
            .into_iter()
            .find(|e| (e.start == start && e.end == end) || (e.start == end && e.end == start))
            .ok_or_else(|| RoutyError::NotFound(format!("edge {start} <-> {end}")))
    }

    // ---- agent ----

    /// Train on a tour environment. Episodes and learning rate fall back to
    /// the configured defaults; orders fall back to a demo batch.
    pub fn train(
        &mut self,
        episodes: Option<u32>,
        learning_rate: Option<f64>,
        orders: Option<Vec<Order>>,
        vehicles: Vec<Vehicle>,
    ) -> Result<TrainingRecord> {
        let episodes = episodes.unwrap_or(self.learning.episodes);
        if episodes > self.learning.max_episodes {
            return Err(RoutyError::InvalidInput(format!(
                "episodes must be at most {}, got {episodes}",
                self.learning.max_episodes
            )));
        }
        let learning_rate = learning_rate.unwrap_or(self.learning.learning_rate);
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(RoutyError::InvalidInput(format!(
                "learning rate must be positive, got {learning_rate}"
            )));
        }

        let orders = orders.unwrap_or_else(demo_orders);
        validate_batch(&orders)?;
        debug!(
            "Training on {} orders, {} vehicles",
            orders.len(),
            vehicles.len()
        );

        let mut env = TourEnvironment::new(orders)
            .with_vehicles(vehicles)
            .with_max_time_steps(self.learning.max_steps_per_episode);
        self.agent.train(&mut env, episodes, learning_rate)
    }

    pub fn training_history(&self) -> Vec<TrainingRecord> {
        self.agent.history().to_vec()
    }

    pub fn agent_status(&self) -> AgentStatus {
        let dims = self.agent.dimensions();
        AgentStatus {
            mode: self.agent.mode(),
            trained: self.agent.is_trained(),
            learning_enabled: self.agent.config().enabled,
            input_dim: dims.map(|(i, _)| i),
            output_dim: dims.map(|(_, o)| o),
            training_runs: self.agent.history().len(),
            model: self.agent.model_params(),
        }
    }
}

/// Reject batches the sequencer cannot take
pub fn validate_batch(orders: &[Order]) -> Result<()> {
    if orders.is_empty() {
        return Err(RoutyError::InvalidInput(
            "orders list cannot be empty".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::with_capacity(orders.len());
    for order in orders {
        if !order.has_valid_priority() {
            return Err(RoutyError::InvalidInput(format!(
                "order {} has priority {} outside 1..=10",
                order.id, order.priority
            )));
        }
        if !seen.insert(order.id) {
            return Err(RoutyError::InvalidInput(format!(
                "duplicate order id {}",
                order.id
            )));
        }
    }
    Ok(())
}

/// Batch used when a training request brings no orders
pub fn demo_orders() -> Vec<Order> {
    vec![
        Order::new(1, "Berlin", "Hamburg").with_priority(2),
        Order::new(2, "München", "Stuttgart").with_priority(1),
        Order::new(3, "Köln", "Frankfurt").with_priority(3),
    ]
}
