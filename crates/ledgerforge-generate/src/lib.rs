//! Demo-data generation engine for a remote ledger API.
//!
//! Creates a full organization → ledger → asset/portfolio/segment → account
//! → transaction hierarchy against the remote API, with retry, circuit
//! breaking, bounded-concurrency batching, and a plugin hook pipeline.

pub mod batch;
pub mod breaker;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod guard;
pub mod metrics;
pub mod plugins;
pub mod progress;
pub mod registry;
pub mod report;
pub mod retry;
pub mod transactions;

pub use engine::GenerationEngine;
pub use errors::GenerationError;
pub use metrics::GenerationMetrics;
pub use registry::StateRegistry;
pub use report::{EntityReport, GenerationReport};
