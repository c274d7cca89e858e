//! Protocol size limits
//!
//! These values are part of the consensus: every node must enforce exactly
//! the same bounds, so they are constants rather than configuration.

/// Maximum channel removals proposed by one observation. Larger diffs are
/// applied in batches over several rounds.
pub const MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH: usize = 5;

/// Maximum channel additions/replacements proposed by one observation.
pub const MAX_OBSERVATION_UPDATE_CHANNEL_DEFINITIONS_LENGTH: usize = 5;

/// Maximum stream values carried by one observation.
pub const MAX_OBSERVATION_STREAM_VALUES_LENGTH: usize = 10_000;

/// Maximum channels held by an outcome.
pub const MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH: usize = 10_000;

/// Transport-level maxima advertised in the plugin info.
pub const MAX_MAX_QUERY_LENGTH: usize = 5 * 1024 * 1024;
pub const MAX_MAX_OBSERVATION_LENGTH: usize = 1024 * 1024;
pub const MAX_MAX_OUTCOME_LENGTH: usize = 5 * 1024 * 1024;
pub const MAX_MAX_REPORT_LENGTH: usize = 5 * 1024 * 1024;
pub const MAX_MAX_REPORT_COUNT: usize = 2_000;
