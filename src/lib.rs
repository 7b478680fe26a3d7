//! flowscope: push-based streaming queries over network-flow records.
//!
//! Modular structure:
//! - [`record`]: field values, records, group and join keys
//! - [`operator`]: the `Operator` trait plus windowing, aggregation, dedup and join
//! - [`detectors`]: anomaly detectors wired from the operators
//! - [`ingest`]: flow CSV and JSON packet readers with their drivers
//! - [`sink`]: dump, CSV, JSON-lines and in-memory result sinks
//! - [`config`]: JSON engine configuration
//! - [`logging`]: structured logging

pub mod config;
pub mod detectors;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod operator;
pub mod record;
pub mod sink;

pub use config::EngineConfig;
pub use detectors::{build as build_detector, Detector, DetectorConfig, DetectorKind};
pub use error::{Result, StreamError};
pub use logging::StructuredLogger;
pub use operator::{BoxedOperator, Operator};
pub use record::{GroupKey, JoinKey, Record, Value};
