//! xdb - a compact two-level IPv4 region index.
//!
//! This crate builds and searches xdb files: a fixed 256-byte header, a
//! fixed 512 KiB vector index addressed by the top two bytes of an address,
//! a block of deduplicated region infos and a flat segment index.
//!
//! # Quick Start
//!
//! ```ignore
//! use xdb::{Maker, MakerConfig, Searcher};
//!
//! // Build from a `start|end|region` text file
//! let mut maker = Maker::open(MakerConfig::default(), "ip.merge.txt", "ip2region.xdb")?;
//! maker.init()?;
//! let stats = maker.start()?;
//! maker.end()?;
//!
//! // Look an address up
//! let searcher = Searcher::open("ip2region.xdb")?;
//! let region = searcher.search_str("1.2.3.4")?;
//! ```
//!
//! # Source Format
//!
//! One segment per line, ascending and gapless:
//!
//! ```text
//! 0.0.0.0|0.255.255.255|Reserved
//! 1.0.0.0|1.0.0.255|Australia|0|0
//! ```
//!
//! Everything after the second `|` is the region info, stored verbatim as
//! raw bytes in whatever encoding the source uses.

mod config;
mod error;
mod region_pool;
mod vector_index;

pub mod format;
pub mod ip;
pub mod maker;
pub mod searcher;
pub mod segment;
pub mod writer;

// Re-export core types
pub use config::MakerConfig;
pub use error::{AddressError, Error, Result};
pub use format::{Header, IndexPolicy};
pub use maker::{BuildStats, Maker, MakerState};
pub use region_pool::RegionPool;
pub use searcher::{Searcher, VerifyReport};
pub use segment::{load_segments, Segment};
pub use vector_index::VectorIndex;
