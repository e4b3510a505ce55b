//! Travel time predictor
//!
//! Blends the diurnal pattern with the live congestion signal. For a
//! departure `h` hours from now:
//!
//! - `0 <= h <= live_window_hours`: `delay = live_weight * live + (1 - live_weight) * pattern`
//! - otherwise: `delay = pattern`
//!
//! and `predicted = base * (1 + delay)`, where `base` is the shortest-path
//! length on the current network. The pattern value carries a uniform jitter
//! of `±jitter * pattern`, floored at zero.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use routy_core::util::local_now;
use routy_core::{CongestionSource, RoadNetwork, Result, RoutyError};

use crate::pattern::DiurnalPatterns;
use crate::prediction::{
    round_to, DepartureOption, OptimalDeparture, TrafficInfo, TrafficLevel, TrafficStatus,
    TravelTimePrediction,
};

/// Upper bound for forecast and search windows
pub const MAX_FORECAST_HOURS: u32 = 48;
/// Default departure search window
pub const DEFAULT_SEARCH_WINDOW_HOURS: u32 = 12;
/// Default hourly forecast length
pub const DEFAULT_FORECAST_HOURS: u32 = 24;
/// Number of runner-up options reported by a window search
pub const MAX_ALTERNATIVES: usize = 3;

/// Confidence for departures inside the live window
pub const NEAR_TERM_CONFIDENCE: f64 = 0.8;
/// Confidence for pattern-only departures
pub const PATTERN_CONFIDENCE: f64 = 0.6;

/// Minutes of delay reported for a fully congested route
const MAX_TRAFFIC_DELAY_MINUTES: f64 = 30.0;

/// Predictor tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Relative jitter applied to the pattern delay (0.2 = ±20%)
    pub jitter: f64,
    /// Departures at most this many hours ahead use the live signal
    pub live_window_hours: f64,
    /// Weight of the live signal inside the window
    pub live_weight: f64,
    /// Seed for the jitter RNG; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            jitter: 0.2,
            live_window_hours: 2.0,
            live_weight: 0.7,
            seed: None,
        }
    }
}

/// Source of "now" for the live window
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        local_now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parameters of a departure window search
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureQuery {
    pub origin: String,
    pub destination: String,
    /// First departure considered; now when absent
    pub earliest_departure: Option<NaiveDateTime>,
    /// Options arriving later are marked invalid
    pub latest_arrival: Option<NaiveDateTime>,
    pub window_hours: u32,
}

impl DepartureQuery {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            earliest_departure: None,
            latest_arrival: None,
            window_hours: DEFAULT_SEARCH_WINDOW_HOURS,
        }
    }

    pub fn earliest(mut self, departure: NaiveDateTime) -> Self {
        self.earliest_departure = Some(departure);
        self
    }

    pub fn latest_arrival(mut self, arrival: NaiveDateTime) -> Self {
        self.latest_arrival = Some(arrival);
        self
    }

    pub fn window(mut self, hours: u32) -> Self {
        self.window_hours = hours;
        self
    }
}

/// Time-dependent travel time predictor
pub struct TravelTimePredictor {
    patterns: DiurnalPatterns,
    config: ForecastConfig,
    rng: StdRng,
    clock: Box<dyn Clock>,
}

impl TravelTimePredictor {
    pub fn new(config: ForecastConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            patterns: DiurnalPatterns::default(),
            config,
            rng,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock used to decide whether a departure is near-term
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_patterns(mut self, patterns: DiurnalPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn patterns(&self) -> &DiurnalPatterns {
        &self.patterns
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Pattern delay at `departure`, jittered
    pub fn pattern_delay(&mut self, departure: &NaiveDateTime) -> f64 {
        let delay = self.patterns.delay_at(departure);
        let spread = delay * self.config.jitter;
        if spread <= 0.0 {
            return delay.max(0.0);
        }
        (delay + self.rng.gen_range(-spread..=spread)).max(0.0)
    }

    /// Predict travel time from `origin` to `destination` leaving at `departure`
    pub fn predict(
        &mut self,
        network: &RoadNetwork,
        source: &dyn CongestionSource,
        origin: &str,
        destination: &str,
        departure: NaiveDateTime,
    ) -> Result<TravelTimePrediction> {
        for location in [origin, destination] {
            if !network.has_location(location) {
                return Err(RoutyError::NotFound(location.to_string()));
            }
        }
        let base = network
            .shortest_path_length(origin, destination)
            .ok_or_else(|| RoutyError::NoPath {
                from: origin.to_string(),
                to: destination.to_string(),
            })?;

        let pattern_delay = self.pattern_delay(&departure);

        let hours_until =
            (departure - self.clock.now()).num_milliseconds() as f64 / 3_600_000.0;
        let near_term = hours_until <= self.config.live_window_hours;

        let final_delay = if (0.0..=self.config.live_window_hours).contains(&hours_until) {
            let live = source.current_delay();
            self.config.live_weight * live + (1.0 - self.config.live_weight) * pattern_delay
        } else {
            pattern_delay
        };

        let predicted = base * (1.0 + final_delay);
        debug!(
            "Predicted {} -> {} at {}: base {:.1}, delay {:.3}, predicted {:.1}",
            origin, destination, departure, base, final_delay, predicted
        );

        Ok(TravelTimePrediction {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_time: departure,
            base_minutes: base,
            predicted_minutes: round_to(predicted, 1),
            delay_minutes: round_to(predicted - base, 1),
            delay_factor: round_to(final_delay, 2),
            traffic_level: TrafficLevel::from_delay(final_delay),
            confidence: if near_term {
                NEAR_TERM_CONFIDENCE
            } else {
                PATTERN_CONFIDENCE
            },
        })
    }

    /// Evaluate one departure per hour of the window and recommend the
    /// fastest one that still meets the latest arrival
    pub fn find_optimal_departure(
        &mut self,
        network: &RoadNetwork,
        source: &dyn CongestionSource,
        query: &DepartureQuery,
    ) -> Result<OptimalDeparture> {
        if query.window_hours == 0 || query.window_hours > MAX_FORECAST_HOURS {
            return Err(RoutyError::InvalidInput(format!(
                "search window must be between 1 and {MAX_FORECAST_HOURS} hours, got {}",
                query.window_hours
            )));
        }

        let earliest = query.earliest_departure.unwrap_or_else(|| self.clock.now());
        let mut options = Vec::with_capacity(query.window_hours as usize);
        let mut last_error = None;

        for hour_offset in 0..query.window_hours {
            let Some(departure) =
                earliest.checked_add_signed(Duration::hours(i64::from(hour_offset)))
            else {
                last_error = Some(out_of_calendar(hour_offset));
                break;
            };
            match self.predict(network, source, &query.origin, &query.destination, departure) {
                Ok(prediction) => {
                    let Some(arrival) = arrival_after(departure, prediction.predicted_minutes)
                    else {
                        debug!("Arrival for offset {} is out of calendar range", hour_offset);
                        last_error = Some(out_of_calendar(hour_offset));
                        continue;
                    };
                    let valid = query.latest_arrival.map_or(true, |latest| arrival <= latest);
                    options.push(DepartureOption {
                        prediction,
                        arrival_time: arrival,
                        valid,
                        hour_offset,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        if options.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                RoutyError::Internal("departure search evaluated no options".to_string())
            }));
        }

        let total_options_analyzed = options.len();
        let mut candidates: Vec<DepartureOption> =
            options.iter().filter(|o| o.valid).cloned().collect();
        if candidates.is_empty() {
            debug!("No departure meets the latest arrival, ranking all options");
            candidates = options;
        }

        // Stable: equal durations keep the earlier departure first
        candidates.sort_by(|a, b| {
            a.prediction
                .predicted_minutes
                .total_cmp(&b.prediction.predicted_minutes)
        });
        let mut ranked = candidates.into_iter();
        let recommendation = ranked
            .next()
            .ok_or_else(|| RoutyError::Internal("empty candidate list".to_string()))?;
        let alternatives = ranked.take(MAX_ALTERNATIVES).collect();

        Ok(OptimalDeparture {
            recommendation,
            alternatives,
            total_options_analyzed,
            search_window_hours: query.window_hours,
        })
    }

    /// One prediction per hour from now. Hours whose prediction fails are
    /// left out.
    pub fn hourly_forecast(
        &mut self,
        network: &RoadNetwork,
        source: &dyn CongestionSource,
        origin: &str,
        destination: &str,
        hours: u32,
    ) -> Result<Vec<TravelTimePrediction>> {
        if hours > MAX_FORECAST_HOURS {
            return Err(RoutyError::InvalidInput(format!(
                "forecast is limited to {MAX_FORECAST_HOURS} hours, got {hours}"
            )));
        }

        let now = self.clock.now();
        let forecast = (0..hours)
            .filter_map(|offset| {
                let departure = now.checked_add_signed(Duration::hours(i64::from(offset)))?;
                self.predict(network, source, origin, destination, departure)
                    .ok()
            })
            .collect();
        Ok(forecast)
    }

    /// Live traffic summary for a route
    pub fn traffic_info(
        &self,
        source: &dyn CongestionSource,
        origin: &str,
        destination: &str,
    ) -> TrafficInfo {
        let delay = source.current_delay();
        TrafficInfo {
            origin: origin.to_string(),
            destination: destination.to_string(),
            delay_factor: delay,
            estimated_delay_minutes: (delay * MAX_TRAFFIC_DELAY_MINUTES) as u32,
            traffic_status: TrafficStatus::from_delay(delay),
        }
    }
}

/// `departure + minutes`, `None` past the representable calendar range
fn arrival_after(departure: NaiveDateTime, minutes: f64) -> Option<NaiveDateTime> {
    let travel = Duration::try_milliseconds((minutes * 60_000.0) as i64)?;
    departure.checked_add_signed(travel)
}

fn out_of_calendar(hour_offset: u32) -> RoutyError {
    RoutyError::InvalidInput(format!(
        "departure option at +{hour_offset}h falls outside the supported calendar range"
    ))
}

impl Default for TravelTimePredictor {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use routy_core::{FixedCongestion, NoCongestion};

    /// Monday 2024-03-04
    fn monday(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn deterministic() -> TravelTimePredictor {
        TravelTimePredictor::new(ForecastConfig {
            jitter: 0.0,
            ..ForecastConfig::default()
        })
        .with_clock(FixedClock(monday(0)))
    }

    fn line() -> RoadNetwork {
        let mut net = RoadNetwork::empty();
        net.add_edge("A", "B", 100.0).unwrap();
        net.add_location("Island");
        net
    }

    #[test]
    fn test_pattern_only_prediction() {
        let mut predictor = deterministic();
        // 10:00 Monday is 10h ahead, pattern 0.2
        let p = predictor
            .predict(&line(), &NoCongestion, "A", "B", monday(10))
            .unwrap();
        assert_eq!(p.base_minutes, 100.0);
        assert_eq!(p.predicted_minutes, 120.0);
        assert_eq!(p.delay_minutes, 20.0);
        assert_eq!(p.delay_factor, 0.2);
        assert_eq!(p.traffic_level, TrafficLevel::Low);
        assert_eq!(p.confidence, PATTERN_CONFIDENCE);
    }

    #[test]
    fn test_live_blend_inside_window() {
        let mut predictor = TravelTimePredictor::new(ForecastConfig {
            jitter: 0.0,
            ..ForecastConfig::default()
        })
        .with_clock(FixedClock(monday(7)));
        let live = FixedCongestion::new(1.0);
        // 08:00 is 1h ahead: 0.7 * 1.0 + 0.3 * 0.9
        let p = predictor
            .predict(&line(), &live, "A", "B", monday(8))
            .unwrap();
        assert_eq!(p.delay_factor, 0.97);
        assert_eq!(p.predicted_minutes, 197.0);
        assert_eq!(p.confidence, NEAR_TERM_CONFIDENCE);
        assert_eq!(p.traffic_level, TrafficLevel::VeryHigh);
    }

    #[test]
    fn test_past_departure_uses_pattern_with_near_term_confidence() {
        let mut predictor = TravelTimePredictor::new(ForecastConfig {
            jitter: 0.0,
            ..ForecastConfig::default()
        })
        .with_clock(FixedClock(monday(12)));
        let live = FixedCongestion::new(1.0);
        let p = predictor
            .predict(&line(), &live, "A", "B", monday(10))
            .unwrap();
        assert_eq!(p.delay_factor, 0.2);
        assert_eq!(p.confidence, NEAR_TERM_CONFIDENCE);
    }

    #[test]
    fn test_live_window_boundary() {
        let mut predictor = TravelTimePredictor::new(ForecastConfig {
            jitter: 0.0,
            ..ForecastConfig::default()
        })
        .with_clock(FixedClock(monday(8)));
        let live = FixedCongestion::new(1.0);

        // Exactly 2h ahead still blends: 0.7 * 1.0 + 0.3 * 0.2
        let at_limit = predictor
            .predict(&line(), &live, "A", "B", monday(10))
            .unwrap();
        assert_eq!(at_limit.confidence, NEAR_TERM_CONFIDENCE);
        assert_eq!(at_limit.delay_factor, 0.76);
        assert_eq!(at_limit.predicted_minutes, 176.0);

        // One second later the pattern alone applies
        let past = predictor
            .predict(
                &line(),
                &live,
                "A",
                "B",
                monday(10) + Duration::seconds(1),
            )
            .unwrap();
        assert_eq!(past.confidence, PATTERN_CONFIDENCE);
        assert_eq!(past.delay_factor, 0.2);
        assert_eq!(past.predicted_minutes, 120.0);
    }

    #[test]
    fn test_not_found_and_no_path_are_distinct() {
        let mut predictor = deterministic();
        let net = line();
        assert!(matches!(
            predictor.predict(&net, &NoCongestion, "A", "Atlantis", monday(10)),
            Err(RoutyError::NotFound(name)) if name == "Atlantis"
        ));
        assert!(matches!(
            predictor.predict(&net, &NoCongestion, "A", "Island", monday(10)),
            Err(RoutyError::NoPath { .. })
        ));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut predictor = TravelTimePredictor::new(ForecastConfig {
            seed: Some(7),
            ..ForecastConfig::default()
        });
        let departure = monday(8);
        for _ in 0..500 {
            let delay = predictor.pattern_delay(&departure);
            assert!(
                (0.72 - 1e-9..=1.08 + 1e-9).contains(&delay),
                "delay {delay} out of ±20%"
            );
        }
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let make = || {
            TravelTimePredictor::new(ForecastConfig {
                seed: Some(42),
                ..ForecastConfig::default()
            })
            .with_clock(FixedClock(monday(0)))
        };
        let (mut a, mut b) = (make(), make());
        let net = line();
        for hour in [6, 8, 13, 18] {
            let pa = a.predict(&net, &NoCongestion, "A", "B", monday(hour)).unwrap();
            let pb = b.predict(&net, &NoCongestion, "A", "B", monday(hour)).unwrap();
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn test_optimal_departure_picks_fastest() {
        let mut predictor = deterministic();
        let query = DepartureQuery::new("A", "B").earliest(monday(6)).window(6);
        let result = predictor
            .find_optimal_departure(&line(), &NoCongestion, &query)
            .unwrap();
        // 06..11: 0.3 0.7 0.9 0.6 0.2 0.25
        assert_eq!(result.recommendation.hour_offset, 4);
        assert_eq!(result.recommendation.prediction.predicted_minutes, 120.0);
        assert_eq!(result.total_options_analyzed, 6);
        assert_eq!(result.search_window_hours, 6);

        let offsets: Vec<u32> = result.alternatives.iter().map(|o| o.hour_offset).collect();
        assert_eq!(offsets, vec![5, 0, 3]);
    }

    #[test]
    fn test_optimal_departure_respects_latest_arrival() {
        let mut predictor = deterministic();
        // Must arrive by 09:30: only 06:00 (130 min -> 08:10) and
        // 07:00 (170 min -> 09:50, invalid) are candidates
        let query = DepartureQuery::new("A", "B")
            .earliest(monday(6))
            .latest_arrival(monday(9) + Duration::minutes(30))
            .window(6);
        let result = predictor
            .find_optimal_departure(&line(), &NoCongestion, &query)
            .unwrap();
        assert!(result.recommendation.valid);
        assert_eq!(result.recommendation.hour_offset, 0);
        assert!(result.alternatives.iter().all(|o| o.valid));
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_optimal_departure_falls_back_when_nothing_valid() {
        let mut predictor = deterministic();
        let query = DepartureQuery::new("A", "B")
            .earliest(monday(6))
            .latest_arrival(monday(6))
            .window(3);
        let result = predictor
            .find_optimal_departure(&line(), &NoCongestion, &query)
            .unwrap();
        assert!(!result.recommendation.valid);
        assert_eq!(result.recommendation.hour_offset, 0);
        assert_eq!(result.alternatives.len(), 2);
    }

    #[test]
    fn test_optimal_departure_window_bounds() {
        let mut predictor = deterministic();
        let net = line();
        for window in [0, 49] {
            let query = DepartureQuery::new("A", "B").window(window);
            assert!(matches!(
                predictor.find_optimal_departure(&net, &NoCongestion, &query),
                Err(RoutyError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_optimal_departure_rejects_unrepresentable_arrival() {
        let mut predictor = deterministic();
        let mut net = RoadNetwork::empty();
        net.add_edge("A", "B", 1.0e12).unwrap();
        let query = DepartureQuery::new("A", "B").window(2);
        assert!(matches!(
            predictor.find_optimal_departure(&net, &NoCongestion, &query),
            Err(RoutyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_optimal_departure_near_calendar_end_skips_overflowing_hours() {
        let mut predictor = deterministic();
        let query = DepartureQuery::new("A", "B")
            .earliest(NaiveDateTime::MAX - Duration::hours(10))
            .window(12);
        let result = predictor
            .find_optimal_departure(&line(), &NoCongestion, &query)
            .unwrap();
        assert!(result.total_options_analyzed < 12);
        assert!(result.recommendation.hour_offset < 10);
        assert!(result.alternatives.iter().all(|o| o.hour_offset < 10));
    }

    #[test]
    fn test_optimal_departure_propagates_lookup_error() {
        let mut predictor = deterministic();
        let query = DepartureQuery::new("A", "Island").window(3);
        assert!(matches!(
            predictor.find_optimal_departure(&line(), &NoCongestion, &query),
            Err(RoutyError::NoPath { .. })
        ));
    }

    #[test]
    fn test_hourly_forecast() {
        let mut predictor = deterministic();
        let net = line();
        let forecast = predictor
            .hourly_forecast(&net, &NoCongestion, "A", "B", 24)
            .unwrap();
        assert_eq!(forecast.len(), 24);
        assert_eq!(forecast[0].departure_time, monday(0));
        assert_eq!(forecast[23].departure_time, monday(23));

        assert!(predictor
            .hourly_forecast(&net, &NoCongestion, "A", "B", 0)
            .unwrap()
            .is_empty());
        assert!(predictor
            .hourly_forecast(&net, &NoCongestion, "A", "Island", 5)
            .unwrap()
            .is_empty());
        assert!(matches!(
            predictor.hourly_forecast(&net, &NoCongestion, "A", "B", 49),
            Err(RoutyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_traffic_info() {
        let predictor = deterministic();
        let info = predictor.traffic_info(&FixedCongestion::new(0.5), "A", "B");
        assert_eq!(info.estimated_delay_minutes, 15);
        assert_eq!(info.traffic_status, TrafficStatus::Moderate);
    }
}
