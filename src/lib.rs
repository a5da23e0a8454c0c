//! finrec - financial product recommendations with hosted model failover
//!
//! This library classifies a free-text question, composes a recommendation
//! from a caller-supplied product catalog, and keeps answering when hosted
//! model services fail: primary, then secondary, then a canned response.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod orchestrator;
pub mod providers;
pub mod recommend;
pub mod telemetry;
