//! Locating mapfile records for a set of local commits
//!
//! Recent commits are appended at the end of the mapfile, so the records a
//! peer is missing cluster near the tail. The scan walks records backwards
//! and stops as soon as every requested commit has been found.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::model::{CommitId, LOCAL_RANGE, RECORD_LEN};

/// Records found by [`find_missing_lines`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MissingLines {
    /// Raw records, in mapfile order
    pub lines: Vec<String>,
    /// Records examined before the scan stopped
    pub records_visited: usize,
}

/// Find the record of every commit in `wanted`.
///
/// Fails if the mapfile is not a whole number of records, if a visited
/// record is malformed, or if any requested commit has no record.
pub fn find_missing_lines(
    content: &[u8],
    wanted: &FxHashSet<CommitId>,
    file: &str,
) -> Result<MissingLines> {
    // Skip reading the mapfile at all when nothing is missing
    if wanted.is_empty() {
        return Ok(MissingLines::default());
    }

    if content.len() % RECORD_LEN != 0 {
        return Err(Error::InvalidMapfileLength {
            file: file.to_string(),
            len: content.len() as u64,
            record_len: RECORD_LEN,
        });
    }

    let mut remaining = wanted.clone();
    let mut found: Vec<String> = Vec::with_capacity(wanted.len());
    let count = content.len() / RECORD_LEN;
    let mut visited = 0;

    for i in (0..count).rev() {
        visited += 1;
        let offset = i * RECORD_LEN;
        let record = &content[offset..offset + RECORD_LEN];
        let local = std::str::from_utf8(&record[LOCAL_RANGE])
            .ok()
            .and_then(|hex| CommitId::from_hex(hex).ok())
            .ok_or_else(|| Error::MalformedRecord {
                file: file.to_string(),
                offset: offset as u64,
                reason: "local id is not 40 hex characters".to_string(),
            })?;

        if remaining.remove(&local) {
            found.push(String::from_utf8_lossy(record).into_owned());
            if remaining.is_empty() {
                found.reverse();
                return Ok(MissingLines {
                    lines: found,
                    records_visited: visited,
                });
            }
        }
    }

    let example = remaining
        .iter()
        .min()
        .map(|id| id.to_hex())
        .unwrap_or_default();
    Err(Error::MissingHashes {
        file: file.to_string(),
        missing: remaining.len(),
        requested: wanted.len(),
        example,
    })
}
