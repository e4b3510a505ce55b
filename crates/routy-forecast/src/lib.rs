//! Routy Forecast - time-dependent travel time prediction
//!
//! Combines diurnal traffic patterns with the live congestion signal to
//! predict travel times, search departure windows and produce hourly
//! forecasts over a [`routy_core::RoadNetwork`].

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]

pub mod pattern;
pub mod prediction;
pub mod predictor;

pub use pattern::{DayType, DiurnalPatterns, TrafficPattern};
pub use prediction::{
    DepartureOption, OptimalDeparture, TrafficInfo, TrafficLevel, TrafficStatus,
    TravelTimePrediction,
};
pub use predictor::{
    Clock, DepartureQuery, FixedClock, ForecastConfig, SystemClock, TravelTimePredictor,
    DEFAULT_FORECAST_HOURS, DEFAULT_SEARCH_WINDOW_HOURS, MAX_FORECAST_HOURS,
};
