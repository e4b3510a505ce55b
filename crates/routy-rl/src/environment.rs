//! Training environments
//!
//! The agent trains against any [`Environment`]. [`TourEnvironment`] is the
//! built-in one: it rewards assigning a batch of orders to a fleet of
//! vehicles, most urgent first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use routy_core::order::sort_by_urgency;
use routy_core::{Order, Vehicle};

use crate::state::{
    EnvState, Reward, KEY_ASSIGNED, KEY_ORDERS_LEFT, KEY_TIME, KEY_TOTAL_REWARD,
};

/// Result of one environment step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub state: EnvState,
    pub reward: Reward,
    pub done: bool,
}

/// Episodic environment the sequencing agent learns from
pub trait Environment {
    type Action: Clone;

    /// Start a new episode
    fn reset(&mut self) -> EnvState;

    fn step(&mut self, action: &Self::Action) -> StepOutcome;

    /// Discrete action space, in a fixed order
    fn possible_actions(&self) -> Vec<Self::Action>;
}

pub const DEFAULT_VEHICLE_ID: &str = "vehicle_1";
pub const DEFAULT_MAX_TIME_STEPS: u32 = 100;

pub const REWARD_MOST_URGENT: Reward = 1.0;
pub const REWARD_ASSIGNED: Reward = 0.5;
pub const REWARD_INVALID: Reward = -1.0;

/// Assign one order to one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignAction {
    pub order_id: i64,
    pub vehicle_id: String,
}

impl AssignAction {
    pub fn new(order_id: i64, vehicle_id: impl Into<String>) -> Self {
        Self {
            order_id,
            vehicle_id: vehicle_id.into(),
        }
    }
}

/// Order-to-vehicle assignment environment
#[derive(Debug, Clone)]
pub struct TourEnvironment {
    orders: Vec<Order>,
    vehicles: Vec<Vehicle>,
    pub time: u32,
    pub max_time_steps: u32,
    /// order id -> vehicle id
    pub assigned_orders: HashMap<i64, String>,
    pub total_reward: Reward,
}

impl TourEnvironment {
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            vehicles: Vec::new(),
            time: 0,
            max_time_steps: DEFAULT_MAX_TIME_STEPS,
            assigned_orders: HashMap::new(),
            total_reward: 0.0,
        }
    }

    pub fn with_vehicles(mut self, vehicles: Vec<Vehicle>) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_max_time_steps(mut self, steps: u32) -> Self {
        self.max_time_steps = steps;
        self
    }

    pub fn add_order(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.push(vehicle);
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Registered vehicles, or the default `vehicle_1` when none are
    pub fn vehicles(&self) -> Vec<Vehicle> {
        if self.vehicles.is_empty() {
            vec![Vehicle::new(DEFAULT_VEHICLE_ID)]
        } else {
            self.vehicles.clone()
        }
    }

    pub fn orders_left(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| !self.assigned_orders.contains_key(&o.id))
            .count()
    }

    fn load_of(&self, vehicle_id: &str) -> usize {
        self.assigned_orders
            .values()
            .filter(|v| v.as_str() == vehicle_id)
            .count()
    }

    fn most_urgent_unassigned(&self) -> Option<i64> {
        sort_by_urgency(&self.orders)
            .into_iter()
            .find(|o| !self.assigned_orders.contains_key(&o.id))
            .map(|o| o.id)
    }

    fn reward_for(&self, action: &AssignAction) -> Reward {
        if !self.orders.iter().any(|o| o.id == action.order_id) {
            return REWARD_INVALID;
        }
        if self.assigned_orders.contains_key(&action.order_id) {
            return REWARD_INVALID;
        }
        let Some(vehicle) = self
            .vehicles()
            .into_iter()
            .find(|v| v.vehicle_id == action.vehicle_id)
        else {
            return REWARD_INVALID;
        };
        if self.load_of(&vehicle.vehicle_id) >= vehicle.capacity as usize {
            return REWARD_INVALID;
        }

        if self.most_urgent_unassigned() == Some(action.order_id) {
            REWARD_MOST_URGENT
        } else {
            REWARD_ASSIGNED
        }
    }

    fn is_done(&self) -> bool {
        self.orders_left() == 0 || self.time >= self.max_time_steps
    }

    pub fn state(&self) -> EnvState {
        EnvState::new()
            .with(KEY_TIME, f64::from(self.time))
            .with(KEY_ORDERS_LEFT, self.orders_left() as f64)
            .with(KEY_ASSIGNED, self.assigned_orders.len() as f64)
            .with(KEY_TOTAL_REWARD, self.total_reward)
    }
}

impl Environment for TourEnvironment {
    type Action = AssignAction;

    fn reset(&mut self) -> EnvState {
        self.time = 0;
        self.assigned_orders.clear();
        self.total_reward = 0.0;
        self.state()
    }

    fn step(&mut self, action: &AssignAction) -> StepOutcome {
        self.time += 1;
        let reward = self.reward_for(action);
        if reward > 0.0 {
            self.assigned_orders
                .insert(action.order_id, action.vehicle_id.clone());
        }
        self.total_reward += reward;
        debug!(
            "Step {}: order {} -> {}, reward {:.1}",
            self.time, action.order_id, action.vehicle_id, reward
        );

        StepOutcome {
            state: self.state(),
            reward,
            done: self.is_done(),
        }
    }

    fn possible_actions(&self) -> Vec<AssignAction> {
        let vehicles = self.vehicles();
        self.orders
            .iter()
            .flat_map(|order| {
                vehicles
                    .iter()
                    .map(move |v| AssignAction::new(order.id, v.vehicle_id.clone()))
            })
            .collect()
    }
}
