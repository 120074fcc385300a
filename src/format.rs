//! xdb binary format constants and fixed-size records.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |      HEADER      |  256 bytes (fixed)
//! +------------------+
//! |   VECTOR INDEX   |  512 KiB (fixed): 256x256 cells of (first ptr, last ptr)
//! +------------------+
//! |   REGION DATA    |  variable: deduplicated region blobs, no delimiter
//! +------------------+
//! |  SEGMENT INDEX   |  variable: 14-byte entries
//! +------------------+
//! ```
//!
//! All integers are little-endian.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Current format version.
pub const VERSION_NO: u16 = 2;

/// Header size in bytes.
pub const HEADER_INFO_LENGTH: usize = 256;

/// Vector index rows, addressed by bits 31..24 of the address.
pub const VECTOR_INDEX_ROWS: usize = 256;

/// Vector index columns, addressed by bits 23..16 of the address.
pub const VECTOR_INDEX_COLS: usize = 256;

/// Size of a single vector index cell.
pub const VECTOR_INDEX_SIZE: usize = 8;

/// Total size of the vector index region.
pub const VECTOR_INDEX_LENGTH: usize = VECTOR_INDEX_ROWS * VECTOR_INDEX_COLS * VECTOR_INDEX_SIZE;

/// Size of a single segment index entry.
pub const SEGMENT_INDEX_BLOCK_SIZE: usize = 14;

/// Longest region info a segment index entry can describe.
pub const MAX_REGION_LENGTH: usize = u16::MAX as usize;

/// Header offset of the start/end segment index pointers.
pub const INDEX_PTR_OFFSET: u64 = 8;

/// Offset of the first region data byte.
pub const DATA_START: u64 = (HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH) as u64;

/// Index policy code stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum IndexPolicy {
    /// Vector grid over a flat segment index
    #[default]
    Vector = 1,
    /// Reserved for the b-tree search scheme
    BTree = 2,
}

impl IndexPolicy {
    /// Parse a policy name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "vector" | "vectorindex" => Some(IndexPolicy::Vector),
            "btree" | "btreeindex" => Some(IndexPolicy::BTree),
            _ => None,
        }
    }

    /// Convert from the header code.
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(IndexPolicy::Vector),
            2 => Some(IndexPolicy::BTree),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexPolicy::Vector => "VectorIndex",
            IndexPolicy::BTree => "BtreeIndex",
        }
    }
}

impl fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File header (256 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version, fixed to 2
    pub version: u16,
    /// Raw index policy code
    pub index_policy: u16,
    /// Unix timestamp when the file was generated
    pub created_at: u32,
    /// Offset of the first segment index entry
    pub start_index_ptr: u32,
    /// Offset of the last segment index entry
    pub end_index_ptr: u32,
}

impl Header {
    /// Placeholder header with zero index pointers.
    pub fn new(policy: IndexPolicy, created_at: u32) -> Self {
        Self {
            version: VERSION_NO,
            index_policy: policy.as_u16(),
            created_at,
            start_index_ptr: 0,
            end_index_ptr: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_INFO_LENGTH] {
        let mut buf = [0u8; HEADER_INFO_LENGTH];
        buf[0..2].copy_from_slice(&self.version.to_le_bytes());
        buf[2..4].copy_from_slice(&self.index_policy.to_le_bytes());
        buf[4..8].copy_from_slice(&self.created_at.to_le_bytes());
        buf[8..12].copy_from_slice(&self.start_index_ptr.to_le_bytes());
        buf[12..16].copy_from_slice(&self.end_index_ptr.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_INFO_LENGTH {
            return Err(Error::InvalidHeaderSize {
                expected: HEADER_INFO_LENGTH,
                actual: buf.len(),
            });
        }

        Ok(Self {
            version: read_u16(buf, 0),
            index_policy: read_u16(buf, 2),
            created_at: read_u32(buf, 4),
            start_index_ptr: read_u32(buf, 8),
            end_index_ptr: read_u32(buf, 12),
        })
    }

    /// Validate the header version.
    pub fn validate(&self) -> Result<()> {
        if self.version != VERSION_NO {
            return Err(Error::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    pub fn policy(&self) -> Option<IndexPolicy> {
        IndexPolicy::from_u16(self.index_policy)
    }
}

/// Segment index entry (14 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentIndexBlock {
    pub start_ip: u32,
    pub end_ip: u32,
    /// Length of the region info in bytes
    pub data_len: u16,
    /// Offset of the region info
    pub data_ptr: u32,
}

impl SegmentIndexBlock {
    pub fn encode(&self) -> [u8; SEGMENT_INDEX_BLOCK_SIZE] {
        let mut buf = [0u8; SEGMENT_INDEX_BLOCK_SIZE];
        buf[0..4].copy_from_slice(&self.start_ip.to_le_bytes());
        buf[4..8].copy_from_slice(&self.end_ip.to_le_bytes());
        buf[8..10].copy_from_slice(&self.data_len.to_le_bytes());
        buf[10..14].copy_from_slice(&self.data_ptr.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            start_ip: read_u32(buf, 0),
            end_ip: read_u32(buf, 4),
            data_len: read_u16(buf, 8),
            data_ptr: read_u32(buf, 10),
        }
    }
}

/// Vector index cell (8 bytes on disk).
///
/// `last_ptr` is the end (exclusive) of the cell's last segment index entry.
/// Both pointers are zero for unused cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VectorIndexBlock {
    pub first_ptr: u32,
    pub last_ptr: u32,
}

impl VectorIndexBlock {
    pub fn encode(&self) -> [u8; VECTOR_INDEX_SIZE] {
        let mut buf = [0u8; VECTOR_INDEX_SIZE];
        buf[0..4].copy_from_slice(&self.first_ptr.to_le_bytes());
        buf[4..8].copy_from_slice(&self.last_ptr.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            first_ptr: read_u32(buf, 0),
            last_ptr: read_u32(buf, 4),
        }
    }

    pub fn is_unused(&self) -> bool {
        self.first_ptr == 0
    }

    /// Number of segment index entries bracketed by this cell.
    pub fn entry_count(&self) -> usize {
        (self.last_ptr.saturating_sub(self.first_ptr) as usize) / SEGMENT_INDEX_BLOCK_SIZE
    }
}

/// Vector index cell position of an address.
pub fn vector_cell(ip: u32) -> usize {
    (((ip >> 24) & 0xFF) as usize) * VECTOR_INDEX_COLS + ((ip >> 16) & 0xFF) as usize
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
