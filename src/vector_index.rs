//! In-memory vector index accumulator.

use std::io::{Seek, Write};

use crate::format::*;
use crate::writer::OffsetWriter;
use crate::Result;

/// 256x256 grid of segment index brackets, stored flat as `row * 256 + col`.
///
/// # Ordering precondition
///
/// [`VectorIndex::record`] must be called in ascending address order for
/// each cell. The first call for a cell fixes its `first_ptr` and every later
/// call moves `last_ptr` forward, so out-of-order calls silently produce a
/// wrong bracket. The segment loader's contiguity check is what guarantees
/// this order for the maker.
pub struct VectorIndex {
    cells: Box<[VectorIndexBlock]>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            cells: vec![VectorIndexBlock::default(); VECTOR_INDEX_ROWS * VECTOR_INDEX_COLS]
                .into_boxed_slice(),
        }
    }

    /// Extend the cell of `ip` to cover the segment index entry at `ptr`.
    pub fn record(&mut self, ip: u32, ptr: u32) {
        let cell = &mut self.cells[vector_cell(ip)];
        let end = ptr + SEGMENT_INDEX_BLOCK_SIZE as u32;
        if cell.first_ptr == 0 {
            cell.first_ptr = ptr;
        }
        cell.last_ptr = end;
    }

    pub fn get(&self, ip: u32) -> VectorIndexBlock {
        self.cells[vector_cell(ip)]
    }

    /// Number of cells holding at least one entry.
    pub fn used_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_unused()).count()
    }

    /// Serialize every cell in row-major order, unused ones included.
    pub fn write_to<W: Write + Seek>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        let mut buf = Vec::with_capacity(VECTOR_INDEX_LENGTH);
        for cell in self.cells.iter() {
            buf.extend_from_slice(&cell.encode());
        }
        out.write_block(&buf)?;
        Ok(())
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_first_entry_of_cell() {
        let mut index = VectorIndex::new();
        index.record(0x0102_0304, 1000);

        assert_eq!(
            index.get(0x0102_FFFF),
            VectorIndexBlock { first_ptr: 1000, last_ptr: 1014 }
        );
        assert!(index.get(0x0103_0000).is_unused());
        assert_eq!(index.used_cells(), 1);
    }

    #[test]
    fn test_record_extends_last_ptr() {
        let mut index = VectorIndex::new();
        index.record(0x0A00_0000, 2000);
        index.record(0x0A00_0100, 2014);
        index.record(0x0A00_0200, 2028);

        let cell = index.get(0x0A00_0000);
        assert_eq!(cell, VectorIndexBlock { first_ptr: 2000, last_ptr: 2042 });
        assert_eq!(cell.entry_count(), 3);
    }

    #[test]
    fn test_write_to_is_row_major() {
        let mut index = VectorIndex::new();
        index.record(0x0000_0000, 10);
        index.record(0x0001_0000, 24);
        index.record(0xFFFF_0000, 38);

        let mut out = OffsetWriter::new(Cursor::new(Vec::new()));
        index.write_to(&mut out).unwrap();
        let buf = out.into_inner().into_inner();

        assert_eq!(buf.len(), VECTOR_INDEX_LENGTH);
        let cell = |i: usize| VectorIndexBlock::decode(&buf[i * VECTOR_INDEX_SIZE..]);
        assert_eq!(cell(0), VectorIndexBlock { first_ptr: 10, last_ptr: 24 });
        assert_eq!(cell(1), VectorIndexBlock { first_ptr: 24, last_ptr: 38 });
        assert!(cell(2).is_unused());
        assert_eq!(cell(65535), VectorIndexBlock { first_ptr: 38, last_ptr: 52 });
    }
}
