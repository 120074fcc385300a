//! IP segments and the line-oriented segment loader.
//!
//! Source format, one segment per line:
//!
//! ```text
//! <start ip>|<end ip>|<region info, may itself contain '|'>
//! ```
//!
//! Region info is kept as raw bytes, so sources in any encoding load as-is.

use std::borrow::Cow;
use std::fmt;
use std::io::BufRead;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::ip::{long2ip, parse_ip};

/// A contiguous address range mapped to one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start_ip: u32,
    pub end_ip: u32,
    pub region: Vec<u8>,
}

impl Segment {
    pub fn new(start_ip: u32, end_ip: u32, region: impl Into<Vec<u8>>) -> Self {
        Self {
            start_ip,
            end_ip,
            region: region.into(),
        }
    }

    /// Region info for display, with invalid UTF-8 replaced.
    pub fn region_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.region)
    }

    /// Split the segment at vector index cell boundaries.
    ///
    /// Every returned piece shares the top two address bytes between its
    /// start and end. Pieces are ordered, gapless and together cover the
    /// segment exactly.
    pub fn split(&self) -> Vec<Segment> {
        let mut pieces = Vec::new();
        let mut start = self.start_ip;

        loop {
            let end = (start | 0xFFFF).min(self.end_ip);
            pieces.push(Segment::new(start, end, self.region.clone()));
            if end == self.end_ip {
                break;
            }
            start = end + 1;
        }

        pieces
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            long2ip(self.start_ip),
            long2ip(self.end_ip),
            self.region_lossy()
        )
    }
}

/// Load and validate segments from a line reader.
///
/// Blank lines are skipped. The result is strictly ascending and gapless:
/// `segments[i].end_ip + 1 == segments[i + 1].start_ip`.
pub fn load_segments<R: BufRead>(reader: R) -> Result<Vec<Segment>> {
    let started = Instant::now();
    let mut segments: Vec<Segment> = Vec::new();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let segment = parse_segment_line(line, line_no)?;

        if let Some(last) = segments.last() {
            let expected = u64::from(last.end_ip) + 1;
            if expected != u64::from(segment.start_ip) {
                return Err(Error::DiscontinuousRange {
                    line: line_no,
                    expected,
                    actual: segment.start_ip,
                });
            }
        }

        log::trace!("load segment: `{}`", segment);
        segments.push(segment);
    }

    log::info!(
        "all segments loaded, length: {}, elapsed: {:?}",
        segments.len(),
        started.elapsed()
    );
    Ok(segments)
}

fn parse_segment_line(line: &[u8], line_no: usize) -> Result<Segment> {
    let content = || String::from_utf8_lossy(line).into_owned();

    let fields: Vec<&[u8]> = line.splitn(3, |b| *b == b'|').collect();
    if fields.len() != 3 {
        return Err(Error::MalformedLine {
            line: line_no,
            content: content(),
        });
    }

    // Non-UTF-8 bytes become U+FFFD and fail as an invalid octet
    let start = String::from_utf8_lossy(fields[0]);
    let end = String::from_utf8_lossy(fields[1]);
    let address = |value: &str| {
        parse_ip(value).map_err(|source| Error::InvalidAddress {
            line: line_no,
            value: value.to_string(),
            source,
        })
    };
    let start_ip = address(&start)?;
    let end_ip = address(&end)?;

    if start_ip > end_ip {
        return Err(Error::InvalidRange {
            line: line_no,
            start: start.into_owned(),
            end: end.into_owned(),
        });
    }

    if fields[2].is_empty() {
        return Err(Error::EmptyText {
            line: line_no,
            content: content(),
        });
    }

    Ok(Segment::new(start_ip, end_ip, fields[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AddressError;

    fn load(text: &str) -> Result<Vec<Segment>> {
        load_segments(text.as_bytes())
    }

    #[test]
    fn test_load_dotted_quad_segments() {
        let segments = load(
            "0.0.0.0|0.255.255.255|Reserved\n\
             1.0.0.0|1.0.0.255|Australia|0|0\n\
             1.0.1.0|255.255.255.255|China|Fujian\n",
        )
        .unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Segment::new(0x01000000, 0x010000FF, "Australia|0|0"));
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_ip + 1, pair[1].start_ip);
        }
    }

    #[test]
    fn test_load_integer_segments() {
        let segments = load("0|16777215|US\n16777216|33554431|CN\n").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_ip, 16777216);
        assert_eq!(segments[1].region, b"CN");
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let segments = load("\n  1.0.0.0|1.0.0.9|A  \r\n\r\n1.0.0.10|1.0.0.20|B\n").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].region, b"A");
        assert_eq!(segments[1].region, b"B");
    }

    #[test]
    fn test_hash_line_is_not_a_comment() {
        let err = load("#1.0.0.0|1.0.0.1|A\n").unwrap_err();
        match err {
            Error::InvalidAddress { line, value, .. } => {
                assert_eq!(line, 1);
                assert_eq!(value, "#1.0.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_keeps_non_utf8_region_bytes() {
        // "China" in GBK
        let src: &[u8] = b"1.0.0.0|1.0.0.255|\xD6\xD0\xB9\xFA\n1.0.1.0|1.0.1.255|\xC8\xD5\xB1\xBE|0\n";
        let segments = load_segments(src).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].region, b"\xD6\xD0\xB9\xFA");
        assert_eq!(segments[1].region, b"\xC8\xD5\xB1\xBE|0");
    }

    #[test]
    fn test_non_utf8_address_is_invalid() {
        let src: &[u8] = b"1.0.0.\xFF|1.0.0.255|US\n";
        assert!(matches!(
            load_segments(src).unwrap_err(),
            Error::InvalidAddress {
                line: 1,
                source: AddressError::InvalidOctet(_),
                ..
            }
        ));
    }

    #[test]
    fn test_load_empty_input() {
        assert!(load("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_address() {
        let err = load("1.2.3.4|1.2.3.x|US").unwrap_err();
        match err {
            Error::InvalidAddress { line, value, source } => {
                assert_eq!(line, 1);
                assert_eq!(value, "1.2.3.x");
                assert!(matches!(source, AddressError::InvalidOctet(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            load("1.2.3.4|1.2.3.5").unwrap_err(),
            Error::MalformedLine { line: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_range() {
        assert!(matches!(
            load("1.2.3.5|1.2.3.4|US").unwrap_err(),
            Error::InvalidRange { line: 1, .. }
        ));
    }

    #[test]
    fn test_empty_text() {
        assert!(matches!(
            load("1.2.3.4|1.2.3.5|").unwrap_err(),
            Error::EmptyText { line: 1, .. }
        ));
    }

    #[test]
    fn test_discontinuous_gap_and_overlap() {
        let gap = load("1.0.0.0|1.0.0.9|A\n1.0.0.11|1.0.0.20|B").unwrap_err();
        assert!(matches!(
            gap,
            Error::DiscontinuousRange { line: 2, expected: 0x0100000A, actual: 0x0100000B }
        ));

        let overlap = load("1.0.0.0|1.0.0.9|A\n1.0.0.5|1.0.0.20|B").unwrap_err();
        assert!(matches!(overlap, Error::DiscontinuousRange { line: 2, .. }));
    }

    #[test]
    fn test_nothing_follows_the_last_address() {
        let err = load("0.0.0.0|255.255.255.255|A\n0.0.0.0|0.0.0.1|B").unwrap_err();
        assert!(matches!(
            err,
            Error::DiscontinuousRange { expected: 0x1_0000_0000, actual: 0, .. }
        ));
    }

    #[test]
    fn test_split_within_one_cell() {
        let seg = Segment::new(0x01020000, 0x0102FFFF, "A");
        assert_eq!(seg.split(), vec![seg.clone()]);
    }

    #[test]
    fn test_split_across_cells() {
        let seg = Segment::new(0x0102FFF0, 0x01050010, "A");
        let pieces = seg.split();

        assert_eq!(
            pieces
                .iter()
                .map(|p| (p.start_ip, p.end_ip))
                .collect::<Vec<_>>(),
            vec![
                (0x0102FFF0, 0x0102FFFF),
                (0x01030000, 0x0103FFFF),
                (0x01040000, 0x0104FFFF),
                (0x01050000, 0x01050010),
            ]
        );
        for piece in &pieces {
            assert_eq!(piece.start_ip >> 16, piece.end_ip >> 16);
            assert_eq!(piece.region, b"A");
        }
    }

    #[test]
    fn test_split_full_space() {
        let pieces = Segment::new(0, u32::MAX, "all").split();
        assert_eq!(pieces.len(), 65536);
        assert_eq!(pieces.first().map(|p| p.start_ip), Some(0));
        assert_eq!(pieces.last().map(|p| p.end_ip), Some(u32::MAX));
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].end_ip + 1, pair[1].start_ip);
        }
    }

    #[test]
    fn test_display() {
        let seg = Segment::new(0x01000000, 0x010000FF, "AU");
        assert_eq!(seg.to_string(), "1.0.0.0|1.0.0.255|AU");
    }
}
