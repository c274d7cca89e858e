//! Stream values
//!
//! The closed set of numeric values a stream can carry. Each variant has a
//! binary form (wire), a text form (logs) and a decoder that rejects empty or
//! malformed input with a typed error.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use llo_types::StreamId;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of the big-endian scale prefix of a binary decimal.
const DECIMAL_SCALE_LEN: usize = 8;

/// Size of each length prefix inside a binary quote.
const QUOTE_FIELD_PREFIX_LEN: usize = 4;

/// Stream value decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamValueError {
    /// Nothing to decode
    #[error("Cannot unmarshal empty {0} value")]
    Empty(&'static str),

    /// Input is truncated or inconsistent
    #[error("Malformed {kind} value: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// Discriminant does not name a known variant
    #[error("Unknown stream value type: {0}")]
    UnknownType(u8),
}

/// Wire discriminant of a stream value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamValueType {
    Decimal = 0,
    Quote = 1,
}

impl TryFrom<u8> for StreamValueType {
    type Error = StreamValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Decimal),
            1 => Ok(Self::Quote),
            other => Err(StreamValueError::UnknownType(other)),
        }
    }
}

/// Arbitrary-precision decimal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(pub BigDecimal);

impl Decimal {
    /// Scale (8 bytes, big-endian) followed by the signed big-endian digits.
    pub fn marshal_binary(&self) -> Vec<u8> {
        let (digits, scale) = self.0.as_bigint_and_exponent();
        let digits = digits.to_signed_bytes_be();
        let mut out = Vec::with_capacity(DECIMAL_SCALE_LEN + digits.len());
        out.extend_from_slice(&scale.to_be_bytes());
        out.extend_from_slice(&digits);
        out
    }

    pub fn unmarshal_binary(bytes: &[u8]) -> Result<Self, StreamValueError> {
        if bytes.is_empty() {
            return Err(StreamValueError::Empty("decimal"));
        }
        if bytes.len() <= DECIMAL_SCALE_LEN {
            return Err(StreamValueError::Malformed {
                kind: "decimal",
                reason: format!("expected more than {} bytes, got {}", DECIMAL_SCALE_LEN, bytes.len()),
            });
        }
        let (scale, digits) = bytes.split_at(DECIMAL_SCALE_LEN);
        let mut scale_bytes = [0u8; DECIMAL_SCALE_LEN];
        scale_bytes.copy_from_slice(scale);
        let scale = i64::from_be_bytes(scale_bytes);
        let digits = BigInt::from_signed_bytes_be(digits);
        Ok(Self(BigDecimal::new(digits, scale)))
    }

    pub fn marshal_text(&self) -> String {
        self.0.to_string()
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }
}

impl FromStr for Decimal {
    type Err = StreamValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(StreamValueError::Empty("decimal"));
        }
        BigDecimal::from_str(s)
            .map(Self)
            .map_err(|e| StreamValueError::Malformed {
                kind: "decimal",
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bid / benchmark / ask triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quote {
    pub bid: Decimal,
    pub benchmark: Decimal,
    pub ask: Decimal,
}

impl Quote {
    pub fn new(bid: Decimal, benchmark: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            benchmark,
            ask,
        }
    }

    /// Holds iff `bid <= benchmark <= ask`.
    pub fn is_valid(&self) -> bool {
        self.bid <= self.benchmark && self.benchmark <= self.ask
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for field in [&self.bid, &self.benchmark, &self.ask] {
            let encoded = field.marshal_binary();
            out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
            out.extend_from_slice(&encoded);
        }
        out
    }

    pub fn unmarshal_binary(bytes: &[u8]) -> Result<Self, StreamValueError> {
        if bytes.is_empty() {
            return Err(StreamValueError::Empty("quote"));
        }
        let mut rest = bytes;
        let bid = take_quote_field(&mut rest, "bid")?;
        let benchmark = take_quote_field(&mut rest, "benchmark")?;
        let ask = take_quote_field(&mut rest, "ask")?;
        if !rest.is_empty() {
            return Err(StreamValueError::Malformed {
                kind: "quote",
                reason: format!("{} trailing bytes", rest.len()),
            });
        }
        Ok(Self {
            bid,
            benchmark,
            ask,
        })
    }

    pub fn marshal_text(&self) -> String {
        self.to_string()
    }
}

fn take_quote_field(rest: &mut &[u8], field: &str) -> Result<Decimal, StreamValueError> {
    if rest.len() < QUOTE_FIELD_PREFIX_LEN {
        return Err(StreamValueError::Malformed {
            kind: "quote",
            reason: format!("missing length prefix for {}", field),
        });
    }
    let (prefix, tail) = rest.split_at(QUOTE_FIELD_PREFIX_LEN);
    let mut len_bytes = [0u8; QUOTE_FIELD_PREFIX_LEN];
    len_bytes.copy_from_slice(prefix);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if tail.len() < len {
        return Err(StreamValueError::Malformed {
            kind: "quote",
            reason: format!("{} needs {} bytes, {} left", field, len, tail.len()),
        });
    }
    let (encoded, tail) = tail.split_at(len);
    *rest = tail;
    Decimal::unmarshal_binary(encoded)
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Q{{Bid: {}, Benchmark: {}, Ask: {}}}",
            self.bid, self.benchmark, self.ask
        )
    }
}

/// A single observed or aggregated stream value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StreamValue {
    Decimal(Decimal),
    Quote(Quote),
}

impl StreamValue {
    pub fn value_type(&self) -> StreamValueType {
        match self {
            Self::Decimal(_) => StreamValueType::Decimal,
            Self::Quote(_) => StreamValueType::Quote,
        }
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        match self {
            Self::Decimal(d) => d.marshal_binary(),
            Self::Quote(q) => q.marshal_binary(),
        }
    }

    pub fn unmarshal_binary(
        value_type: StreamValueType,
        bytes: &[u8],
    ) -> Result<Self, StreamValueError> {
        match value_type {
            StreamValueType::Decimal => Decimal::unmarshal_binary(bytes).map(Self::Decimal),
            StreamValueType::Quote => Quote::unmarshal_binary(bytes).map(Self::Quote),
        }
    }

    pub fn marshal_text(&self) -> String {
        self.to_string()
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Self::Decimal(d) => Some(d),
            Self::Quote(_) => None,
        }
    }

    pub fn as_quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote(q) => Some(q),
            Self::Decimal(_) => None,
        }
    }
}

impl fmt::Display for StreamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Quote(q) => write!(f, "{}", q),
        }
    }
}

impl From<Decimal> for StreamValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Quote> for StreamValue {
    fn from(value: Quote) -> Self {
        Self::Quote(value)
    }
}

/// Request/response map handed to the data source. `None` means absent.
pub type StreamValues = BTreeMap<StreamId, Option<StreamValue>>;
