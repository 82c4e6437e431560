//! PROPEDGE: player-prop edge scoring and parlay ranking engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod storage;
pub mod strategy;
pub mod analytics;
pub mod engine;
pub mod dashboard;
