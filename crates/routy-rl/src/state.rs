//! Environment state and reward types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reward value from environment
pub type Reward = f64;

pub const KEY_TIME: &str = "time";
pub const KEY_ORDERS_LEFT: &str = "orders_left";
/// Older environments report the open order count under this name
pub const KEY_REMAINING: &str = "remaining";
pub const KEY_ASSIGNED: &str = "assigned_orders_count";
pub const KEY_TOTAL_REWARD: &str = "total_reward";

/// Length of [`EnvState::to_features`]
pub const STATE_DIMENSION: usize = 4;

/// Key/value snapshot reported by an environment. Missing keys read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvState {
    values: BTreeMap<String, f64>,
}

impl EnvState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Open order count, read from `orders_left` or its `remaining` alias
    pub fn orders_left(&self) -> f64 {
        self.values
            .get(KEY_ORDERS_LEFT)
            .or_else(|| self.values.get(KEY_REMAINING))
            .copied()
            .unwrap_or(0.0)
    }

    /// Feature vector `[time, orders_left, assigned_orders_count, total_reward]`
    pub fn to_features(&self) -> Vec<f64> {
        vec![
            self.get(KEY_TIME),
            self.orders_left(),
            self.get(KEY_ASSIGNED),
            self.get(KEY_TOTAL_REWARD),
        ]
    }

    /// State dimension for the value network
    pub fn dimension(&self) -> usize {
        STATE_DIMENSION
    }
}
