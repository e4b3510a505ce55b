//! CLI command modules

pub mod agent;
pub mod config;
pub mod http;
pub mod network;
pub mod route;
pub mod travel;
