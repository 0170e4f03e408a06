//! Credit-risk scoring core.
//!
//! Turns a model-estimated probability of default into a 1-1000 score, a risk tier and a
//! dispatch priority, behind a fixed feature contract.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
