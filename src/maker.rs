//! xdb file maker.
//!
//! The maker writes the whole file in one forward pass and then patches
//! two fixed regions:
//!
//! 1. a placeholder header at offset 0,
//! 2. every distinct region info, starting right after the vector index,
//! 3. one segment index entry per cell-aligned piece of every segment,
//! 4. the vector index at offset 256 (back-patch),
//! 5. the start/end segment index pointers at offset 8 (back-patch).

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;
use std::time::Instant;

use crate::config::MakerConfig;
use crate::format::*;
use crate::region_pool::RegionPool;
use crate::segment::{load_segments, Segment};
use crate::vector_index::VectorIndex;
use crate::writer::OffsetWriter;
use crate::{Error, Result};

/// Lifecycle of a [`Maker`].
///
/// `Created -> Initialized -> Built`; a failed step moves to `Failed`.
/// Closing is [`Maker::end`], which consumes the maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakerState {
    Created,
    Initialized,
    Built,
    Failed,
}

impl MakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MakerState::Created => "created",
            MakerState::Initialized => "initialized",
            MakerState::Built => "built",
            MakerState::Failed => "failed",
        }
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Segments loaded from the source
    pub segments: usize,
    /// Distinct region infos in the data block
    pub regions: usize,
    /// Region data bytes written
    pub region_bytes: u64,
    /// Segment index entries written
    pub index_blocks: usize,
    /// Offset of the first segment index entry
    pub start_index_ptr: u32,
    /// Offset of the last segment index entry
    pub end_index_ptr: u32,
    /// Vector index cells with at least one entry
    pub used_cells: usize,
    /// Total size of the output file
    pub file_size: u64,
}

/// Builds an xdb file from a segment source.
///
/// Both handles are owned by the maker and released when it is dropped,
/// whether or not the build succeeded. A failed build leaves a partial
/// file behind that the caller must discard.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use xdb::{Maker, MakerConfig};
///
/// let src = "0.0.0.0|0.255.255.255|Reserved\n1.0.0.0|255.255.255.255|Internet\n";
/// let mut maker = Maker::new(MakerConfig::default(), src.as_bytes(), Cursor::new(Vec::new()));
/// maker.init()?;
/// let stats = maker.start()?;
/// assert_eq!(stats.regions, 2);
/// let data = maker.end()?.into_inner();
/// assert_eq!(&data[0..2], &[2, 0]);
/// # Ok::<(), xdb::Error>(())
/// ```
pub struct Maker<R, W> {
    config: MakerConfig,
    src: R,
    dst: OffsetWriter<W>,
    state: MakerState,
    segments: Vec<Segment>,
    region_pool: RegionPool,
    vector_index: VectorIndex,
}

impl Maker<BufReader<File>, BufWriter<File>> {
    /// Open the source file for reading and create (or truncate) the
    /// destination file.
    pub fn open(config: MakerConfig, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<Self> {
        let src = src.as_ref();
        let dst = dst.as_ref();
        log::debug!("open source {:?}, target {:?}", src, dst);

        let src_handle = File::open(src)?;
        let dst_handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(dst)?;

        Ok(Self::new(
            config,
            BufReader::new(src_handle),
            BufWriter::new(dst_handle),
        ))
    }
}

impl<R: BufRead, W: Write + Seek> Maker<R, W> {
    /// Create a maker over an already opened source and destination.
    /// The destination must be positioned at offset 0.
    pub fn new(config: MakerConfig, src: R, dst: W) -> Self {
        Self {
            config,
            src,
            dst: OffsetWriter::new(dst),
            state: MakerState::Created,
            segments: Vec::new(),
            region_pool: RegionPool::new(),
            vector_index: VectorIndex::new(),
        }
    }

    pub fn state(&self) -> MakerState {
        self.state
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn region_pool(&self) -> &RegionPool {
        &self.region_pool
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.vector_index
    }

    /// Write the placeholder header and load all segments.
    pub fn init(&mut self) -> Result<()> {
        self.expect_state(MakerState::Created, "init")?;

        let result = self.init_db_header().and_then(|_| {
            log::info!("try to load the segments ... ");
            self.segments = load_segments(&mut self.src)?;
            Ok(())
        });

        self.state = if result.is_ok() {
            MakerState::Initialized
        } else {
            MakerState::Failed
        };
        result
    }

    /// Write the data block, the segment index, the vector index and the
    /// final header pointers.
    pub fn start(&mut self) -> Result<BuildStats> {
        self.expect_state(MakerState::Initialized, "start")?;
        if self.segments.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let result = self.build();
        self.state = if result.is_ok() {
            MakerState::Built
        } else {
            MakerState::Failed
        };
        result
    }

    /// Flush the destination and release the source.
    ///
    /// Returns the destination handle.
    pub fn end(mut self) -> Result<W> {
        self.dst.flush()?;
        Ok(self.dst.into_inner())
    }

    fn expect_state(&self, expected: MakerState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                operation,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn init_db_header(&mut self) -> Result<()> {
        log::info!("try to init the db header ... ");
        let header = Header::new(self.config.index_policy, self.config.timestamp());
        self.dst.seek_to(0)?;
        self.dst.write_block(&header.encode())?;
        Ok(())
    }

    fn build(&mut self) -> Result<BuildStats> {
        let started = Instant::now();

        // 1, write all the region/data to the binary file
        self.dst.seek_to(DATA_START)?;
        log::info!("try to write the data block ... ");
        let data_ptrs = self
            .segments
            .iter()
            .map(|seg| self.region_pool.intern(&seg.region, &mut self.dst))
            .collect::<Result<Vec<u32>>>()?;

        // 2, write the segment index and fill the vector index
        log::info!("try to write the segment index block ... ");
        let mut counter = 0usize;
        let mut start_index_ptr = None;
        let mut end_index_ptr = 0u32;
        for (seg, data_ptr) in self.segments.iter().zip(data_ptrs) {
            let pieces = seg.split();
            log::debug!("try to index segment({} splits) {} ...", pieces.len(), seg);

            for piece in &pieces {
                let block = SegmentIndexBlock {
                    start_ip: piece.start_ip,
                    end_ip: piece.end_ip,
                    data_len: seg.region.len() as u16,
                    data_ptr,
                };
                let ptr = self.dst.write_block(&block.encode())?;
                log::trace!("|-segment index: {}, ptr: {}, segment: {}", counter, ptr, piece);

                self.vector_index.record(piece.start_ip, ptr);
                start_index_ptr.get_or_insert(ptr);
                end_index_ptr = ptr;
                counter += 1;
            }
        }
        let start_index_ptr = start_index_ptr.ok_or(Error::EmptyPayload)?;
        let file_size = u64::from(self.dst.position()?);

        // 3, synchronize the vector index
        log::info!("try to write the vector index block ... ");
        self.dst.seek_to(HEADER_INFO_LENGTH as u64)?;
        self.vector_index.write_to(&mut self.dst)?;

        // 4, synchronize the segment index pointers
        log::info!("try to write the segment index ptr ... ");
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&start_index_ptr.to_le_bytes());
        buf[4..8].copy_from_slice(&end_index_ptr.to_le_bytes());
        self.dst.seek_to(INDEX_PTR_OFFSET)?;
        self.dst.write_block(&buf)?;
        self.dst.flush()?;

        let stats = BuildStats {
            segments: self.segments.len(),
            regions: self.region_pool.len(),
            region_bytes: self.region_pool.bytes_written(),
            index_blocks: counter,
            start_index_ptr,
            end_index_ptr,
            used_cells: self.vector_index.used_cells(),
            file_size,
        };
        log::info!(
            "write done, dataBlocks: {}, indexBlocks: ({}, {}), indexPtr: ({}, {}), elapsed: {:?}",
            stats.regions,
            stats.segments,
            stats.index_blocks,
            stats.start_index_ptr,
            stats.end_index_ptr,
            started.elapsed()
        );
        Ok(stats)
    }
}
