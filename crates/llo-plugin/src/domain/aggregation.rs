//! Aggregation engine
//!
//! Reduces the pooled observations of one stream to a single value. Every
//! function requires strictly more than `f` usable inputs, so at least one
//! honest node backs the result. Medians are "upper" medians
//! (`values[len / 2]`) and never interpolate.

use super::stream_value::{Decimal, Quote, StreamValue};
use llo_types::Aggregator;
use std::cmp::Ordering;
use thiserror::Error;

/// Aggregation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Fewer than f+1 usable observations
    #[error("Not enough observations: have {have}, need more than {f}")]
    NotEnoughObservations { have: usize, f: usize },

    /// Aggregator is reserved but has no implementation
    #[error("Aggregator {0} is not implemented")]
    NotImplemented(Aggregator),
}

/// Signature shared by all aggregators.
pub type AggregatorFn = fn(&[StreamValue], usize) -> Result<StreamValue, AggregationError>;

/// Look up the function for an aggregator. `None` means no function is
/// registered, which callers treat as a fatal configuration error.
pub fn aggregator_func(aggregator: Aggregator) -> Option<AggregatorFn> {
    match aggregator {
        Aggregator::Median => Some(median_aggregator),
        Aggregator::Quote => Some(quote_aggregator),
        Aggregator::Mode => Some(mode_aggregator),
        Aggregator::Unspecified => None,
    }
}

/// Upper median over decimal observations. Non-decimal inputs are ignored.
pub fn median_aggregator(values: &[StreamValue], f: usize) -> Result<StreamValue, AggregationError> {
    let mut decimals: Vec<&Decimal> = values.iter().filter_map(StreamValue::as_decimal).collect();
    if decimals.len() <= f {
        return Err(AggregationError::NotEnoughObservations {
            have: decimals.len(),
            f,
        });
    }
    decimals.sort_by(|a, b| canonical_cmp(a, b));
    Ok(StreamValue::Decimal(decimals[decimals.len() / 2].clone()))
}

/// Component-wise upper median over valid quotes.
///
/// Invalid quotes are dropped before counting. Since every input satisfies
/// `bid <= benchmark <= ask`, so does the assembled result.
pub fn quote_aggregator(values: &[StreamValue], f: usize) -> Result<StreamValue, AggregationError> {
    let quotes: Vec<&Quote> = values
        .iter()
        .filter_map(StreamValue::as_quote)
        .filter(|q| q.is_valid())
        .collect();
    if quotes.len() <= f {
        return Err(AggregationError::NotEnoughObservations {
            have: quotes.len(),
            f,
        });
    }

    let mut bids: Vec<&Decimal> = quotes.iter().map(|q| &q.bid).collect();
    let mut benchmarks: Vec<&Decimal> = quotes.iter().map(|q| &q.benchmark).collect();
    let mut asks: Vec<&Decimal> = quotes.iter().map(|q| &q.ask).collect();
    bids.sort_by(|a, b| canonical_cmp(a, b));
    benchmarks.sort_by(|a, b| canonical_cmp(a, b));
    asks.sort_by(|a, b| canonical_cmp(a, b));

    let mid = quotes.len() / 2;
    Ok(StreamValue::Quote(Quote::new(
        bids[mid].clone(),
        benchmarks[mid].clone(),
        asks[mid].clone(),
    )))
}

/// Numerically equal decimals may differ in scale (1.0 vs 1.00); ties are
/// broken on the wire encoding so input order never changes the output bytes.
fn canonical_cmp(a: &Decimal, b: &Decimal) -> Ordering {
    a.cmp(b)
        .then_with(|| a.marshal_binary().cmp(&b.marshal_binary()))
}

/// Reserved.
pub fn mode_aggregator(_values: &[StreamValue], _f: usize) -> Result<StreamValue, AggregationError> {
    Err(AggregationError::NotImplemented(Aggregator::Mode))
}
