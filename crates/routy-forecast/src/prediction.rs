//! Forecast result types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use routy_core::Location;

/// Ordinal traffic label derived from a delay factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrafficLevel {
    #[serde(rename = "very low")]
    VeryLow,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "very high")]
    VeryHigh,
}

impl TrafficLevel {
    pub fn from_delay(delay_factor: f64) -> Self {
        if delay_factor < 0.2 {
            TrafficLevel::VeryLow
        } else if delay_factor < 0.4 {
            TrafficLevel::Low
        } else if delay_factor < 0.6 {
            TrafficLevel::Medium
        } else if delay_factor < 0.8 {
            TrafficLevel::High
        } else {
            TrafficLevel::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficLevel::VeryLow => "very low",
            TrafficLevel::Low => "low",
            TrafficLevel::Medium => "medium",
            TrafficLevel::High => "high",
            TrafficLevel::VeryHigh => "very high",
        }
    }
}

impl std::fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted travel time for one departure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelTimePrediction {
    pub origin: Location,
    pub destination: Location,
    pub departure_time: NaiveDateTime,
    /// Shortest-path minutes on the current network
    pub base_minutes: f64,
    pub predicted_minutes: f64,
    pub delay_minutes: f64,
    pub delay_factor: f64,
    pub traffic_level: TrafficLevel,
    /// 0.8 for departures within the live window, 0.6 otherwise
    pub confidence: f64,
}

/// One evaluated departure slot of a window search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureOption {
    #[serde(flatten)]
    pub prediction: TravelTimePrediction,
    pub arrival_time: NaiveDateTime,
    /// False when the arrival misses the requested latest arrival
    pub valid: bool,
    pub hour_offset: u32,
}

/// Result of a departure window search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalDeparture {
    pub recommendation: DepartureOption,
    /// Up to three next-best options, fastest first
    pub alternatives: Vec<DepartureOption>,
    pub total_options_analyzed: usize,
    pub search_window_hours: u32,
}

/// Coarse live status for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficStatus {
    Free,
    Light,
    Moderate,
    Heavy,
}

impl TrafficStatus {
    pub fn from_delay(delay_factor: f64) -> Self {
        if delay_factor < 0.2 {
            TrafficStatus::Free
        } else if delay_factor < 0.5 {
            TrafficStatus::Light
        } else if delay_factor < 0.8 {
            TrafficStatus::Moderate
        } else {
            TrafficStatus::Heavy
        }
    }
}

/// Live traffic summary for a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficInfo {
    pub origin: Location,
    pub destination: Location,
    pub delay_factor: f64,
    pub estimated_delay_minutes: u32,
    pub traffic_status: TrafficStatus,
}

/// Round to a fixed number of decimals for reporting
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_level_thresholds() {
        assert_eq!(TrafficLevel::from_delay(0.0), TrafficLevel::VeryLow);
        assert_eq!(TrafficLevel::from_delay(0.19), TrafficLevel::VeryLow);
        assert_eq!(TrafficLevel::from_delay(0.2), TrafficLevel::Low);
        assert_eq!(TrafficLevel::from_delay(0.4), TrafficLevel::Medium);
        assert_eq!(TrafficLevel::from_delay(0.6), TrafficLevel::High);
        assert_eq!(TrafficLevel::from_delay(0.79), TrafficLevel::High);
        assert_eq!(TrafficLevel::from_delay(0.8), TrafficLevel::VeryHigh);
        assert_eq!(TrafficLevel::from_delay(1.0), TrafficLevel::VeryHigh);
    }

    #[test]
    fn test_traffic_level_serializes_as_label() {
        let json = serde_json::to_string(&TrafficLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"very high\"");
        assert_eq!(TrafficLevel::Low.to_string(), "low");
    }

    #[test]
    fn test_traffic_status_thresholds() {
        assert_eq!(TrafficStatus::from_delay(0.1), TrafficStatus::Free);
        assert_eq!(TrafficStatus::from_delay(0.2), TrafficStatus::Light);
        assert_eq!(TrafficStatus::from_delay(0.5), TrafficStatus::Moderate);
        assert_eq!(TrafficStatus::from_delay(0.8), TrafficStatus::Heavy);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(22.46, 1), 22.5);
        assert_eq!(round_to(0.125_1, 2), 0.13);
        assert_eq!(round_to(15.0, 1), 15.0);
    }
}
