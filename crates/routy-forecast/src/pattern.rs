//! Diurnal traffic patterns
//!
//! Each pattern is a sorted list of `(hour, delay_factor)` anchors covering
//! the rush-hour peaks. The delay for an hour between two anchors is linearly
//! interpolated; hours outside the anchored range take the nearest anchor's
//! value.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Weekday/weekend classification of a departure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn of(dt: &NaiveDateTime) -> Self {
        match dt.weekday() {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayType::Weekday => write!(f, "weekday"),
            DayType::Weekend => write!(f, "weekend"),
        }
    }
}

/// Piecewise-linear delay curve over the hours of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPattern {
    anchors: Vec<(u32, f64)>,
}

impl TrafficPattern {
    /// Build a pattern; anchors are sorted by hour
    pub fn new(mut anchors: Vec<(u32, f64)>) -> Self {
        anchors.sort_by_key(|(hour, _)| *hour);
        Self { anchors }
    }

    pub fn anchors(&self) -> &[(u32, f64)] {
        &self.anchors
    }

    /// Interpolated delay factor for an hour of day
    pub fn delay_at(&self, hour: u32) -> f64 {
        let (Some(first), Some(last)) = (self.anchors.first(), self.anchors.last()) else {
            return 0.0;
        };
        if hour <= first.0 {
            return first.1;
        }
        if hour >= last.0 {
            return last.1;
        }

        // first.0 < hour < last.0, so both brackets exist
        let next_idx = self.anchors.partition_point(|(h, _)| *h <= hour);
        let (h1, f1) = self.anchors[next_idx - 1];
        let (h2, f2) = self.anchors[next_idx];
        if h1 == hour {
            return f1;
        }

        let t = f64::from(hour - h1) / f64::from(h2 - h1);
        f1 + t * (f2 - f1)
    }
}

/// The weekday and weekend curves used by the forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiurnalPatterns {
    pub weekday: TrafficPattern,
    pub weekend: TrafficPattern,
}

impl DiurnalPatterns {
    pub fn for_day(&self, day: DayType) -> &TrafficPattern {
        match day {
            DayType::Weekday => &self.weekday,
            DayType::Weekend => &self.weekend,
        }
    }

    /// Un-jittered pattern delay at a departure time
    pub fn delay_at(&self, dt: &NaiveDateTime) -> f64 {
        self.for_day(DayType::of(dt)).delay_at(dt.hour())
    }
}

impl Default for DiurnalPatterns {
    fn default() -> Self {
        Self {
            weekday: TrafficPattern::new(vec![
                (6, 0.3),
                (7, 0.7),
                (8, 0.9),
                (9, 0.6),
                (10, 0.2),
                (12, 0.3),
                (17, 0.8),
                (18, 0.9),
                (19, 0.5),
                (22, 0.1),
            ]),
            weekend: TrafficPattern::new(vec![
                (8, 0.1),
                (10, 0.2),
                (12, 0.3),
                (14, 0.4),
                (16, 0.3),
                (18, 0.2),
                (20, 0.1),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_day_type() {
        // 2024-03-04 is a Monday
        assert_eq!(DayType::of(&at(2024, 3, 4, 8)), DayType::Weekday);
        assert_eq!(DayType::of(&at(2024, 3, 8, 8)), DayType::Weekday);
        assert_eq!(DayType::of(&at(2024, 3, 9, 8)), DayType::Weekend);
        assert_eq!(DayType::of(&at(2024, 3, 10, 8)), DayType::Weekend);
    }

    #[test]
    fn test_anchor_hours_are_exact() {
        let patterns = DiurnalPatterns::default();
        assert!(close(patterns.weekday.delay_at(8), 0.9));
        assert!(close(patterns.weekday.delay_at(10), 0.2));
        assert!(close(patterns.weekend.delay_at(14), 0.4));
    }

    #[test]
    fn test_linear_interpolation_between_anchors() {
        let patterns = DiurnalPatterns::default();
        // 10 -> 0.2, 12 -> 0.3
        assert!(close(patterns.weekday.delay_at(11), 0.25));
        // 12 -> 0.3, 17 -> 0.8: one fifth of the way per hour
        assert!(close(patterns.weekday.delay_at(14), 0.5));
        // 19 -> 0.5, 22 -> 0.1
        assert!(close(patterns.weekday.delay_at(20), 0.5 - 0.4 / 3.0));
    }

    #[test]
    fn test_clamps_outside_anchor_range() {
        let patterns = DiurnalPatterns::default();
        assert!(close(patterns.weekday.delay_at(0), 0.3));
        assert!(close(patterns.weekday.delay_at(5), 0.3));
        assert!(close(patterns.weekday.delay_at(23), 0.1));
        assert!(close(patterns.weekend.delay_at(3), 0.1));
        assert!(close(patterns.weekend.delay_at(23), 0.1));
    }

    #[test]
    fn test_unsorted_anchors_are_sorted() {
        let pattern = TrafficPattern::new(vec![(10, 1.0), (0, 0.0)]);
        assert_eq!(pattern.anchors()[0], (0, 0.0));
        assert!(close(pattern.delay_at(5), 0.5));
    }

    #[test]
    fn test_empty_pattern_is_free_flow() {
        assert_eq!(TrafficPattern::new(Vec::new()).delay_at(8), 0.0);
    }

    #[test]
    fn test_patterns_delay_at_picks_curve() {
        let patterns = DiurnalPatterns::default();
        assert!(close(patterns.delay_at(&at(2024, 3, 4, 8)), 0.9));
        assert!(close(patterns.delay_at(&at(2024, 3, 9, 8)), 0.1));
    }
}
