//! Region info deduplication.

use ahash::AHashMap;
use std::io::{Seek, Write};

use crate::format::MAX_REGION_LENGTH;
use crate::writer::OffsetWriter;
use crate::{Error, Result};

/// Maps each distinct region info to the offset of its single copy in
/// the data block. The first write wins; equality is byte-for-byte.
#[derive(Debug, Default)]
pub struct RegionPool {
    offsets: AHashMap<Vec<u8>, u32>,
    bytes_written: u64,
}

impl RegionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the data pointer of `region`, writing it at the cursor of
    /// `out` if it has not been seen before.
    pub fn intern<W: Write + Seek>(
        &mut self,
        region: &[u8],
        out: &mut OffsetWriter<W>,
    ) -> Result<u32> {
        if let Some(&ptr) = self.offsets.get(region) {
            log::trace!(
                " --[Cached] `{}` with ptr={}",
                String::from_utf8_lossy(region),
                ptr
            );
            return Ok(ptr);
        }

        if region.len() > MAX_REGION_LENGTH {
            return Err(Error::TextTooLong {
                len: region.len(),
                max: MAX_REGION_LENGTH,
            });
        }

        let ptr = out.write_block(region)?;
        self.offsets.insert(region.to_vec(), ptr);
        self.bytes_written += region.len() as u64;
        log::trace!(
            " --[Added] `{}` with ptr={}",
            String::from_utf8_lossy(region),
            ptr
        );
        Ok(ptr)
    }

    pub fn get(&self, region: &[u8]) -> Option<u32> {
        self.offsets.get(region).copied()
    }

    /// Number of distinct regions written.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total size of the data block.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
