//! Position-tracking output writer.

use std::io::{Seek, SeekFrom, Write};

use crate::{Error, Result};

/// Wraps the destination and tracks the write cursor in memory.
///
/// Asking a `BufWriter` for its stream position flushes it, so the
/// cursor is kept here instead. Only explicit [`OffsetWriter::seek_to`]
/// calls reach the underlying handle.
pub struct OffsetWriter<W> {
    inner: W,
    pos: u64,
}

impl<W: Write + Seek> OffsetWriter<W> {
    /// Wrap a writer positioned at offset 0.
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    /// Current cursor as a 32-bit file pointer.
    pub fn position(&self) -> Result<u32> {
        u32::try_from(self.pos).map_err(|_| Error::OffsetOverflow(self.pos))
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Write `buf` at the cursor and return the offset it landed at.
    ///
    /// The end of the block must itself be addressable as a u32.
    pub fn write_block(&mut self, buf: &[u8]) -> Result<u32> {
        let at = self.position()?;
        let end = self.pos + buf.len() as u64;
        if end > u64::from(u32::MAX) {
            return Err(Error::OffsetOverflow(end));
        }
        self.inner.write_all(buf)?;
        self.pos = end;
        Ok(at)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
