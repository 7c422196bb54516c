//! Observability stack for the crossplane facade.
//!
//! - **Tracing**: structured logging, human-readable or JSON
//! - **Metrics**: action outcomes and external command latency, exported in
//!   Prometheus text format by the API server
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Observability Layer            │
//! ├──────────────────────┬──────────────────────┤
//! │       Tracing        │       Metrics        │
//! │   (tracing +         │   (metrics +         │
//! │    subscriber)       │    prometheus)       │
//! ├──────────────────────┴──────────────────────┤
//! │     Action Orchestrator / Apply Executor    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{install_prometheus, ActionOutcome, FacadeMetrics, MetricsError};
pub use tracing_setup::{init_tracing, TracingConfig};

/// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level};
