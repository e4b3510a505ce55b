//! Routy Core - road network, order types, and shared functionality
//!
//! This crate provides the foundational types used across all Routy components.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]

pub mod congestion;
pub mod error;
pub mod network;
pub mod order;
pub mod util;

pub use congestion::{CongestionSource, FixedCongestion, NoCongestion, NEUTRAL_DELAY};
pub use error::{Result, RoutyError};
pub use network::{EdgeInfo, RoadNetwork};
pub use order::{Location, Order, RoutePlan, Vehicle};
