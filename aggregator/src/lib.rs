//! Collects a dataset of vehicles from the upstream API, regroups them under
//! their dealers and submits the merged answer.
//!
//! The pipeline runs in strictly sequential stages:
//!
//! ```text
//! dataset id -> vehicle ids -> vehicles (fan-out) -> dealer names (fan-out) -> answer
//! ```
//!
//! Inside the two fan-out stages every entity is fetched concurrently, and a
//! failing entity is recorded as an error instead of aborting the stage.

pub mod api;
pub mod collector;
pub mod config;
pub mod errors;
pub mod fan_out;
pub mod fetchers;
pub mod grouping;
pub mod metrics_defs;
pub mod orchestrator;
pub mod protocol;

#[cfg(test)]
mod testutils;

pub use orchestrator::Aggregator;
