//! Fixed-width mapping records
//!
//! The flat mapfile is a sequence of `<40 hex foreign> <40 hex local>\n`
//! records, 82 bytes each, newest at the end.

use std::fmt;
use std::io::BufRead;

use crate::error::{Error, Result};

use super::ids::{CommitId, ForeignCommitId, HEX_LEN};

/// Size of one serialized record including the trailing newline
pub const RECORD_LEN: usize = 2 * HEX_LEN + 2;

/// Byte range of the local id inside a record
pub const LOCAL_RANGE: std::ops::Range<usize> = (HEX_LEN + 1)..(2 * HEX_LEN + 1);

/// One (foreign, local) pair
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MappingEntry {
    pub foreign: ForeignCommitId,
    pub local: CommitId,
}

impl MappingEntry {
    pub fn new(foreign: ForeignCommitId, local: CommitId) -> Self {
        Self { foreign, local }
    }

    /// Serialize as a full 82-byte record
    pub fn to_record(&self) -> String {
        format!("{} {}\n", self.foreign.to_hex(), self.local.to_hex())
    }
}

/// Why a record failed to parse
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecordError {
    Length(usize),
    Separator,
    Newline,
    ForeignHex,
    LocalHex,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Length(n) => write!(f, "record is {} bytes, expected {}", n, RECORD_LEN),
            RecordError::Separator => f.write_str("missing space separator after foreign id"),
            RecordError::Newline => f.write_str("record does not end with a newline"),
            RecordError::ForeignHex => f.write_str("foreign id is not 40 hex characters"),
            RecordError::LocalHex => f.write_str("local id is not 40 hex characters"),
        }
    }
}

impl RecordError {
    /// Attach file/offset context
    pub fn at(self, file: &str, offset: u64) -> Error {
        Error::MalformedRecord {
            file: file.to_string(),
            offset,
            reason: self.to_string(),
        }
    }
}

/// Parse an exact 82-byte record (newline included)
pub fn parse_record(record: &[u8]) -> Result<MappingEntry, RecordError> {
    if record.len() != RECORD_LEN {
        return Err(RecordError::Length(record.len()));
    }
    if record[RECORD_LEN - 1] != b'\n' {
        return Err(RecordError::Newline);
    }
    parse_pair(&record[..RECORD_LEN - 1])
}

/// Parse one line as read from a file; the trailing newline is optional
pub fn parse_line(line: &[u8]) -> Result<MappingEntry, RecordError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.len() != RECORD_LEN - 1 {
        return Err(RecordError::Length(line.len() + 1));
    }
    parse_pair(line)
}

fn parse_pair(pair: &[u8]) -> Result<MappingEntry, RecordError> {
    if pair[HEX_LEN] != b' ' {
        return Err(RecordError::Separator);
    }
    let foreign = std::str::from_utf8(&pair[..HEX_LEN])
        .ok()
        .and_then(|s| ForeignCommitId::from_hex(s).ok())
        .ok_or(RecordError::ForeignHex)?;
    let local = std::str::from_utf8(&pair[HEX_LEN + 1..])
        .ok()
        .and_then(|s| CommitId::from_hex(s).ok())
        .ok_or(RecordError::LocalHex)?;
    Ok(MappingEntry { foreign, local })
}

/// Streams records from a flat mapfile front to back.
///
/// Blank lines are skipped; anything else that does not parse is an
/// integrity error carrying the byte offset of the bad line.
pub struct RecordReader<R> {
    inner: R,
    file: String,
    offset: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, file: impl Into<String>) -> Self {
        Self {
            inner,
            file: file.into(),
            offset: 0,
            buf: Vec::with_capacity(RECORD_LEN),
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<MappingEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let read = match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(n) => n,
                Err(e) => return Some(Err(Error::io(&self.file, e))),
            };
            let offset = self.offset;
            self.offset += read as u64;
            if self.buf.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            return Some(parse_line(&self.buf).map_err(|e| e.at(&self.file, offset)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT: &str = "6916a3c30f53878032dea8d01074d8c2a03927bd";
    const HG: &str = "47d743e068523a9346a5ea4e429eeab185c886c6";

    #[test]
    fn test_parse_record() {
        let line = format!("{} {}\n", GIT, HG);
        assert_eq!(line.len(), RECORD_LEN);
        let entry = parse_record(line.as_bytes()).unwrap();
        assert_eq!(entry.foreign.to_hex(), GIT);
        assert_eq!(entry.local.to_hex(), HG);
        assert_eq!(entry.to_record(), line);
        assert_eq!(&line[LOCAL_RANGE], HG);
    }

    #[test]
    fn test_parse_record_rejects_bad_shapes() {
        assert_eq!(parse_record(b"abc\n"), Err(RecordError::Length(4)));
        let no_sep = format!("{}-{}\n", GIT, HG);
        assert_eq!(parse_record(no_sep.as_bytes()), Err(RecordError::Separator));
        let no_nl = format!("{} {}x", GIT, HG);
        assert_eq!(parse_record(no_nl.as_bytes()), Err(RecordError::Newline));
        let bad_local = format!("{} {}z\n", GIT, &HG[..39]);
        assert_eq!(parse_record(bad_local.as_bytes()), Err(RecordError::LocalHex));
    }

    #[test]
    fn test_parse_line_allows_missing_newline() {
        let line = format!("{} {}", GIT, HG);
        assert!(parse_line(line.as_bytes()).is_ok());
    }

    #[test]
    fn test_reader_reports_offset() {
        let data = format!("{} {}\n\nnot a record\n", GIT, HG);
        let mut reader = RecordReader::new(data.as_bytes(), "git-mapfile");
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(Error::MalformedRecord { offset, file, .. }) => {
                assert_eq!(offset, 83);
                assert_eq!(file, "git-mapfile");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
