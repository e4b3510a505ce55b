//! Routy Daemon - route planning and travel time service
//!
//! Exposes the road network, the travel-time forecaster and the sequencing
//! agent over HTTP. The binary in `main.rs` only wires configuration and
//! logging around [`daemon::RoutyDaemon`].

// Pedantic clippy allows - intentional design decisions for this crate:
// - doc_markdown: Route and city names in docs don't need backticks
// - too_many_lines: Router construction is kept cohesive
// - cast_precision_loss: Counter averages are far below f64 precision limits
// - cast_possible_truncation: Minute values are bounded by the network size
// - unused_async: Async handlers maintain consistency in axum
// - module_name_repetitions: planner::PlannerStats reads better than planner::Stats
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]
#![allow(clippy::module_name_repetitions)]

pub mod autobahn;
pub mod config;
pub mod daemon;
pub mod planner;
pub mod validation;

pub use config::Config;
pub use daemon::{create_router, DaemonState, RoutyDaemon};
pub use planner::Planner;
