//! Road network graph with traffic-adjusted edge weights
//!
//! Undirected graph over named locations. Every edge keeps its free-flow
//! `base_weight` next to the current `weight`, which traffic updates rewrite
//! as `base_weight * (1 + delay_factor)`. The graph lives in a `petgraph`
//! `UnGraph`; path queries run Dijkstra over the current weights.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RoutyError};
use crate::order::Location;

/// Seed locations loaded by [`RoadNetwork::with_default_network`]
pub const DEFAULT_LOCATIONS: &[&str] = &[
    "Berlin",
    "Hamburg",
    "München",
    "Köln",
    "Frankfurt",
    "Stuttgart",
    "Düsseldorf",
    "Dortmund",
    "Leipzig",
];

/// Seed edges with free-flow travel time in minutes
pub const DEFAULT_EDGES: &[(&str, &str, f64)] = &[
    ("Berlin", "Hamburg", 180.0),
    ("Berlin", "Leipzig", 120.0),
    ("Hamburg", "Düsseldorf", 240.0),
    ("München", "Stuttgart", 150.0),
    ("München", "Frankfurt", 240.0),
    ("Köln", "Düsseldorf", 30.0),
    ("Köln", "Frankfurt", 120.0),
    ("Frankfurt", "Stuttgart", 90.0),
    ("Frankfurt", "Leipzig", 240.0),
    ("Dortmund", "Düsseldorf", 45.0),
    ("Dortmund", "Köln", 60.0),
];

/// Weights carried by one road segment
#[derive(Debug, Clone, Copy)]
struct Segment {
    base_weight: f64,
    weight: f64,
}

impl Segment {
    fn free_flow(travel_time: f64) -> Self {
        Self {
            base_weight: travel_time,
            weight: travel_time,
        }
    }

    fn apply_delay(&mut self, delay_factor: f64) {
        self.weight = self.base_weight * (1.0 + delay_factor);
    }

    fn delay_factor(&self) -> f64 {
        if self.base_weight == 0.0 {
            0.0
        } else {
            self.weight / self.base_weight - 1.0
        }
    }
}

/// Snapshot of one edge as reported by [`RoadNetwork::get_all_edges`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub start: Location,
    pub end: Location,
    pub weight: f64,
    pub base_weight: f64,
    pub delay_factor: f64,
}

/// Weighted, undirected road network
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    graph: UnGraph<Location, Segment>,
    index: HashMap<Location, NodeIndex>,
}

impl RoadNetwork {
    /// Network without any locations
    pub fn empty() -> Self {
        Self::default()
    }

    /// Network pre-loaded with the seed cities so it is queryable before
    /// any external data arrives
    pub fn with_default_network() -> Self {
        let mut network = Self::empty();
        for location in DEFAULT_LOCATIONS {
            network.add_location(*location);
        }
        for (start, end, minutes) in DEFAULT_EDGES {
            // Seed weights are positive constants
            let _ = network.add_edge(*start, *end, *minutes);
        }
        network
    }

    /// Add a location. No-op if it already exists.
    pub fn add_location(&mut self, location: impl Into<Location>) -> usize {
        self.node(location.into()).index()
    }

    fn node(&mut self, location: Location) -> NodeIndex {
        if let Some(&idx) = self.index.get(&location) {
            return idx;
        }
        let idx = self.graph.add_node(location.clone());
        self.index.insert(location, idx);
        idx
    }

    /// Add or overwrite the edge between `start` and `end`, creating missing
    /// locations. Both the base and current weight are set to `travel_time`.
    pub fn add_edge(
        &mut self,
        start: impl Into<Location>,
        end: impl Into<Location>,
        travel_time: f64,
    ) -> Result<()> {
        if !travel_time.is_finite() || travel_time <= 0.0 {
            return Err(RoutyError::InvalidInput(format!(
                "travel time must be a positive number of minutes, got {travel_time}"
            )));
        }

        let a = self.node(start.into());
        let b = self.node(end.into());
        // Keeps the original edge index, and with it the creation order
        self.graph.update_edge(a, b, Segment::free_flow(travel_time));
        Ok(())
    }

    /// Recompute an edge's weight from its base weight and `delay_factor`.
    /// Silently ignored when the edge does not exist. The factor is not
    /// range-checked; producers bound it to [0, 1].
    pub fn update_traffic(&mut self, start: &str, end: &str, delay_factor: f64) {
        let Some(edge) = self.find_edge(start, end) else {
            return;
        };
        if let Some(segment) = self.graph.edge_weight_mut(edge) {
            segment.apply_delay(delay_factor);
            debug!(
                "Traffic update {} <-> {}: delay {:.2}, weight {:.1}",
                start, end, delay_factor, segment.weight
            );
        }
    }

    /// Apply the same delay factor to every edge
    pub fn update_all_traffic(&mut self, delay_factor: f64) {
        for segment in self.graph.edge_weights_mut() {
            segment.apply_delay(delay_factor);
        }
    }

    /// Cheapest path by current weight, `None` if an endpoint is unknown or
    /// unreachable
    pub fn shortest_path(&self, start: &str, end: &str) -> Option<Vec<Location>> {
        let (_, path) = self.cheapest(start, end)?;
        Some(path.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Total current weight along the cheapest path
    pub fn shortest_path_length(&self, start: &str, end: &str) -> Option<f64> {
        self.cheapest(start, end).map(|(cost, _)| cost)
    }

    /// Dijkstra over current weights: A* with a zero heuristic
    fn cheapest(&self, start: &str, end: &str) -> Option<(f64, Vec<NodeIndex>)> {
        let from = *self.index.get(start)?;
        let to = *self.index.get(end)?;
        astar(
            &self.graph,
            from,
            |node| node == to,
            |edge| edge.weight().weight,
            |_| 0.0,
        )
    }

    /// Every edge with its weights and derived delay factor, in creation order
    pub fn get_all_edges(&self) -> Vec<EdgeInfo> {
        self.graph
            .edge_references()
            .map(|edge| {
                let segment = edge.weight();
                EdgeInfo {
                    start: self.graph[edge.source()].clone(),
                    end: self.graph[edge.target()].clone(),
                    weight: segment.weight,
                    base_weight: segment.base_weight,
                    delay_factor: segment.delay_factor(),
                }
            })
            .collect()
    }

    /// Edges whose delay factor is at least `threshold`
    pub fn get_congested_routes(&self, threshold: f64) -> Vec<EdgeInfo> {
        self.get_all_edges()
            .into_iter()
            .filter(|e| e.delay_factor >= threshold)
            .collect()
    }

    /// Directly connected locations
    pub fn neighbors(&self, location: &str) -> Vec<Location> {
        let Some(&idx) = self.index.get(location) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Locations in insertion order
    pub fn locations(&self) -> Vec<Location> {
        self.graph.node_weights().cloned().collect()
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.index.contains_key(location)
    }

    pub fn has_edge(&self, start: &str, end: &str) -> bool {
        self.find_edge(start, end).is_some()
    }

    /// Current weight of a direct edge
    pub fn edge_weight(&self, start: &str, end: &str) -> Option<f64> {
        let edge = self.find_edge(start, end)?;
        self.graph.edge_weight(edge).map(|s| s.weight)
    }

    pub fn location_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn find_edge(&self, start: &str, end: &str) -> Option<EdgeIndex> {
        let a = *self.index.get(start)?;
        let b = *self.index.get(end)?;
        self.graph.find_edge(a, b)
    }
}
