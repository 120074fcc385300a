//! Error types for xdb.

use thiserror::Error;

/// Error type for xdb operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error on the source or destination handle
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Segment line does not have three `|` separated fields
    #[error("line {line}: invalid ip segment line `{content}`")]
    MalformedLine { line: usize, content: String },

    /// Start or end address is not a valid IPv4 address
    #[error("line {line}: invalid address `{value}`: {source}")]
    InvalidAddress {
        line: usize,
        value: String,
        #[source]
        source: AddressError,
    },

    /// Address given to a lookup is not a valid IPv4 address
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    /// Start address greater than end address
    #[error("line {line}: start ip({start}) should not be greater than end ip({end})")]
    InvalidRange {
        line: usize,
        start: String,
        end: String,
    },

    /// Missing region text
    #[error("line {line}: empty region info in segment line `{content}`")]
    EmptyText { line: usize, content: String },

    /// Gap or overlap with the previous segment
    #[error("line {line}: discontinuous data segment: last.eip+1({expected}) != seg.sip({actual})")]
    DiscontinuousRange {
        line: usize,
        expected: u64,
        actual: u32,
    },

    /// Region text longer than a u16 length field can describe
    #[error("too long region info ({len} bytes): should be at most {max} bytes")]
    TextTooLong { len: usize, max: usize },

    /// Build started without any segment loaded
    #[error("empty segment list")]
    EmptyPayload,

    /// Maker operation called in the wrong lifecycle state
    #[error("invalid maker state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Output grew past what a u32 pointer can address
    #[error("file offset {0} does not fit in a 32-bit pointer")]
    OffsetOverflow(u64),

    /// Database file shorter than header plus vector index
    #[error("invalid header size: expected at least {expected}, got {actual}")]
    InvalidHeaderSize { expected: usize, actual: usize },

    /// Unsupported xdb format version
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    /// Database contents inconsistent with the format
    #[error("corrupt database: {0}")]
    Corrupt(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for xdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for IPv4 address parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Not four dot separated parts
    #[error("expected 4 octets, got {0}")]
    OctetCount(usize),

    /// Octet is empty, non-numeric or above 255
    #[error("invalid octet `{0}`")]
    InvalidOctet(String),

    /// Bare integer form out of u32 range or non-numeric
    #[error("invalid integer address `{0}`")]
    InvalidInteger(String),
}
