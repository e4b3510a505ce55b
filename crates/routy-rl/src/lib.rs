//! Routy RL - order sequencing with a learned value model
//!
//! This crate provides the sequencing agent used for route optimization,
//! the environments it trains against, and the TD learner and value network
//! behind its learned mode.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod algorithm;
pub mod environment;
pub mod experience;
pub mod state;
pub mod value;

pub use agent::{
    AgentConfig, AgentMode, Policy, SequencingAgent, TrainingMode, TrainingRecord,
    TrainingStatus,
};
pub use algorithm::TdLearner;
pub use environment::{AssignAction, Environment, StepOutcome, TourEnvironment};
pub use experience::Experience;
pub use state::{EnvState, Reward};
pub use value::ValueNetwork;
