//! Read-only xdb searcher with memory-mapping support.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use crate::format::*;
use crate::ip::{mid_ip, parse_ip};
use crate::segment::Segment;
use crate::{Error, Result};

enum Backing {
    Mmap(Mmap),
    Bytes(Vec<u8>),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Mmap(mmap) => &mmap[..],
            Backing::Bytes(bytes) => bytes.as_slice(),
        }
    }
}

/// Searches an xdb file through its vector index.
///
/// A lookup reads one vector index cell and binary-searches the segment
/// index entries it brackets.
pub struct Searcher {
    data: Backing,
    header: Header,
}

/// Outcome of [`Searcher::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Segments checked
    pub segments: usize,
    /// Addresses looked up
    pub lookups: usize,
    /// Segments whose addresses did not resolve to their region
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl Searcher {
    /// Memory-map an xdb file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_backing(Backing::Mmap(mmap))
    }

    /// Search an xdb image held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_backing(Backing::Bytes(data))
    }

    fn from_backing(data: Backing) -> Result<Self> {
        let bytes = data.as_slice();
        let min_len = HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH;
        if bytes.len() < min_len {
            return Err(Error::InvalidHeaderSize {
                expected: min_len,
                actual: bytes.len(),
            });
        }

        let header = Header::decode(bytes)?;
        header.validate()?;

        Ok(Self { data, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn slice(&self, at: usize, len: usize) -> Result<&[u8]> {
        at.checked_add(len)
            .and_then(|end| self.bytes().get(at..end))
            .ok_or_else(|| {
                Error::Corrupt(format!(
                    "range {}+{} outside of file ({} bytes)",
                    at,
                    len,
                    self.bytes().len()
                ))
            })
    }

    fn vector_block(&self, ip: u32) -> VectorIndexBlock {
        let at = HEADER_INFO_LENGTH + vector_cell(ip) * VECTOR_INDEX_SIZE;
        VectorIndexBlock::decode(&self.bytes()[at..at + VECTOR_INDEX_SIZE])
    }

    /// Find the region info of `ip`, as stored.
    ///
    /// Returns `None` when the address is not covered by the file.
    pub fn search(&self, ip: u32) -> Result<Option<&[u8]>> {
        let cell = self.vector_block(ip);
        if cell.is_unused() {
            return Ok(None);
        }

        let mut low = 0usize;
        let mut high = cell.entry_count();
        while low < high {
            let mid = (low + high) / 2;
            let at = cell.first_ptr as usize + mid * SEGMENT_INDEX_BLOCK_SIZE;
            let block = SegmentIndexBlock::decode(self.slice(at, SEGMENT_INDEX_BLOCK_SIZE)?);

            if ip < block.start_ip {
                high = mid;
            } else if ip > block.end_ip {
                low = mid + 1;
            } else {
                let region = self.slice(block.data_ptr as usize, block.data_len as usize)?;
                return Ok(Some(region));
            }
        }

        Ok(None)
    }

    /// Parse `ip` and find its region.
    pub fn search_str(&self, ip: &str) -> Result<Option<&[u8]>> {
        self.search(parse_ip(ip)?)
    }

    /// Check that the start, middle and end address of every segment
    /// resolve to the segment's region.
    pub fn verify(&self, segments: &[Segment]) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        for seg in segments {
            report.segments += 1;
            for ip in [seg.start_ip, mid_ip(seg.start_ip, seg.end_ip), seg.end_ip] {
                report.lookups += 1;
                let found = self.search(ip)?;
                if found != Some(seg.region.as_slice()) {
                    log::warn!(
                        "failed to verify segment {}: {} resolved to {:?}",
                        seg,
                        crate::ip::long2ip(ip),
                        found.map(String::from_utf8_lossy)
                    );
                    report.mismatches.push(seg.to_string());
                    break;
                }
            }
        }

        log::info!(
            "verified {} segments with {} lookups, {} mismatches",
            report.segments,
            report.lookups,
            report.mismatches.len()
        );
        Ok(report)
    }
}
