//! Order, vehicle and route plan types


use serde::{Deserialize, Serialize};

/// Location identifier. Existence is tracked by road network membership.
pub type Location = String;

/// Most urgent priority
pub const PRIORITY_MIN: u8 = 1;
/// Least urgent priority
pub const PRIORITY_MAX: u8 = 10;

fn default_priority() -> u8 {
    PRIORITY_MIN
}

/// A pickup/delivery order submitted in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique within a batch
    #[serde(rename = "order_id")]
    pub id: i64,
    #[serde(rename = "start_location")]
    pub origin: Location,
    #[serde(rename = "end_location")]
    pub destination: Location,
    /// 1 = most urgent, 10 = least urgent
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl Order {
    pub fn new(id: i64, origin: impl Into<Location>, destination: impl Into<Location>) -> Self {
        Self {
            id,
            origin: origin.into(),
            destination: destination.into(),
            priority: PRIORITY_MIN,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sequencing key: most urgent first, insertion id breaks ties
    pub fn sort_key(&self) -> (u8, i64) {
        (self.priority, self.id)
    }

    pub fn has_valid_priority(&self) -> bool {
        (PRIORITY_MIN..=PRIORITY_MAX).contains(&self.priority)
    }
}

/// Sort a batch by `(priority, id)`. The sort is stable.
pub fn sort_by_urgency(orders: &[Order]) -> Vec<&Order> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by_key(|o| o.sort_key());
    sorted
}

fn default_capacity() -> u32 {
    100
}

/// A vehicle available for order assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

impl Vehicle {
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            capacity: default_capacity(),
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Minutes budgeted per stop when estimating a plan's duration
pub const MINUTES_PER_STOP: u32 = 10;

/// An optimized stop sequence for a batch of orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub route_id: String,
    pub stops: Vec<Location>,
    pub estimated_duration_minutes: u32,
    pub total_orders: usize,
}

impl RoutePlan {
    /// Wrap a stop list produced for `orders` into a plan
    pub fn from_stops(orders: &[Order], stops: Vec<Location>) -> Self {
        let estimated = (stops.len() as u32 * MINUTES_PER_STOP).max(MINUTES_PER_STOP);
        Self {
            route_id: route_id_for(orders),
            stops,
            estimated_duration_minutes: estimated,
            total_orders: orders.len(),
        }
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Route id derived from the batch size and an FNV-1a hash of its order ids.
/// Identical across builds and platforms.
pub fn route_id_for(orders: &[Order]) -> String {
    let hash = orders
        .iter()
        .flat_map(|order| order.id.to_le_bytes())
        .fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
    format!("route_{}_{}", orders.len(), hash % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_wire_names() {
        let json = r#"{"order_id": 7, "start_location": "Berlin", "end_location": "Hamburg"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 7);
        assert_eq!(order.origin, "Berlin");
        assert_eq!(order.destination, "Hamburg");
        assert_eq!(order.priority, 1);

        let back = serde_json::to_value(&order).unwrap();
        assert_eq!(back["start_location"], "Berlin");
        assert_eq!(back["order_id"], 7);
    }

    #[test]
    fn test_sort_by_urgency_is_stable() {
        let orders = vec![
            Order::new(3, "A", "B").with_priority(2),
            Order::new(1, "C", "D").with_priority(2),
            Order::new(2, "E", "F").with_priority(1),
        ];
        let ids: Vec<i64> = sort_by_urgency(&orders).iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_priority_range() {
        assert!(Order::new(1, "A", "B").with_priority(10).has_valid_priority());
        assert!(!Order::new(1, "A", "B").with_priority(0).has_valid_priority());
        assert!(!Order::new(1, "A", "B").with_priority(11).has_valid_priority());
    }

    #[test]
    fn test_route_plan_duration_floor() {
        let plan = RoutePlan::from_stops(&[], Vec::new());
        assert_eq!(plan.estimated_duration_minutes, 10);
        assert_eq!(plan.total_orders, 0);

        let orders = vec![Order::new(1, "A", "B")];
        let plan = RoutePlan::from_stops(&orders, vec!["A".into(), "B".into(), "C".into()]);
        assert_eq!(plan.estimated_duration_minutes, 30);
        assert_eq!(plan.total_orders, 1);
    }

    #[test]
    fn test_route_id_is_stable() {
        let orders = vec![Order::new(1, "A", "B"), Order::new(2, "B", "C")];
        let a = route_id_for(&orders);
        let b = route_id_for(&orders);
        assert_eq!(a, b);
        assert_eq!(a, "route_2_2342");

        // Order matters, the batch is hashed as given
        let reversed = vec![Order::new(2, "B", "C"), Order::new(1, "A", "B")];
        assert_eq!(route_id_for(&reversed), "route_2_5590");
    }

    #[test]
    fn test_vehicle_default_capacity() {
        let vehicle: Vehicle = serde_json::from_str(r#"{"vehicle_id": "truck_1"}"#).unwrap();
        assert_eq!(vehicle.capacity, 100);
        assert_eq!(Vehicle::new("v").with_capacity(5).capacity, 5);
    }
}
