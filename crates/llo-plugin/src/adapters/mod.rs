//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports, for tests and for
//! embedders that keep collaborator state in process.

mod channel_definitions;
mod retirement_reports;
mod should_retire;

pub use channel_definitions::StaticChannelDefinitionCache;
pub use retirement_reports::{
    AttestedRetirementReport, AttributedSignature, InMemoryRetirementReportCache,
    NullRetirementReportCache,
};
pub use should_retire::StaticShouldRetireCache;
