//! # LLO Types Crate
//!
//! Protocol-level types shared by every participant of the Low-Latency
//! Oracle: the reporting plugin, the channel definition source, the report
//! encoders and the transmission layer.
//!
//! ## Design Principles
//!
//! - **Stable numeric ids**: `ReportFormat` and `Aggregator` ids travel on the
//!   wire; changing them is a breaking protocol change.
//! - **Deterministic containers**: every keyed collection is a `BTreeMap` so
//!   that iteration order is identical on every node.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
