//! Client side of a git metadata pull
//!
//! Every part is applied under the repository write lock and every file is
//! replaced atomically.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::model::{
    is_git_meta_file, parse_record, BundlePart, PartKind, SyncPayload, GIT_MAPFILE, RECORD_LEN,
    SYNCED_HEADS_FILE,
};
use crate::repository::HostRepo;

/// Bytes written per file during one pull
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub written: Vec<(String, usize)>,
}

impl ApplyReport {
    pub fn files(&self) -> usize {
        self.written.len()
    }

    pub fn bytes(&self) -> usize {
        self.written.iter().map(|(_, n)| n).sum()
    }

    fn record(&mut self, name: &str, len: usize) {
        self.written.push((name.to_string(), len));
    }
}

pub fn apply_parts(repo: &impl HostRepo, parts: &[BundlePart]) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    for part in parts {
        apply_part(repo, part, &mut report)?;
    }
    Ok(report)
}

pub fn apply_part(repo: &impl HostRepo, part: &BundlePart, report: &mut ApplyReport) -> Result<()> {
    let Some(filename) = validate_part_params(part)? else {
        return Ok(());
    };
    match part.kind {
        PartKind::GitMeta => {
            let _lock = repo.lock()?;
            write_file(repo, filename, &part.data, report)
        }
        PartKind::GitHgMap => {
            if filename != GIT_MAPFILE {
                tracing::warn!("warning: gitmeta: unexpected delta for '{}' skipped", filename);
                return Ok(());
            }
            let _lock = repo.lock()?;
            let payload = SyncPayload::from_json(&part.data)?;
            merge_mapfile(repo, filename, &payload, report)
        }
    }
}

/// The part's target file, or `None` if it is not one we accept
fn validate_part_params(part: &BundlePart) -> Result<Option<&str>> {
    if let Some((name, _)) = part.params.iter().find(|(k, _)| k != "filename") {
        return Err(Error::UnknownPartParam(name.clone()));
    }
    let filename = part
        .param("filename")
        .ok_or(Error::MissingPartParam("filename"))?;
    if !is_git_meta_file(filename) {
        tracing::warn!("warning: gitmeta: unknown file '{}' skipped", filename);
        return Ok(None);
    }
    Ok(Some(filename))
}

fn write_file(
    repo: &impl HostRepo,
    filename: &str,
    data: &[u8],
    report: &mut ApplyReport,
) -> Result<()> {
    repo.store().write_atomic(filename, data)?;
    report.record(filename, data.len());
    Ok(())
}

fn merge_mapfile(
    repo: &impl HostRepo,
    filename: &str,
    payload: &SyncPayload,
    report: &mut ApplyReport,
) -> Result<()> {
    if payload.missing_lines.is_empty() {
        // Heads are only recorded alongside new records
        tracing::debug!("gitmeta: {} already in sync", filename);
        return Ok(());
    }

    // Every line before a bad one parsed, so each was exactly one record
    for (i, line) in payload.missing_lines.iter().enumerate() {
        parse_record(line.as_bytes())
            .map_err(|e| e.at("gitmeta payload", (i * RECORD_LEN) as u64))?;
    }

    let content = if payload.need_full_sync {
        payload.missing_lines.concat()
    } else {
        let current = repo
            .store()
            .read(filename)?
            .ok_or_else(|| Error::UnreadableMetaFile(filename.to_string()))?;
        let mut lines: Vec<String> = String::from_utf8_lossy(&current)
            .split_inclusive('\n')
            .map(|l| if l.ends_with('\n') { l.to_string() } else { format!("{l}\n") })
            .collect();

        let existing: FxHashSet<&str> = lines.iter().map(String::as_str).collect();
        let (overlap, new): (Vec<&String>, Vec<&String>) = payload
            .missing_lines
            .iter()
            .partition(|l| existing.contains(l.as_str()));
        if !overlap.is_empty() {
            tracing::warn!(
                "warning: gitmeta: unexpected lines in {} ({} already present)",
                filename,
                overlap.len()
            );
        }
        let new: Vec<String> = new.into_iter().cloned().collect();
        lines.extend(new);
        lines.concat()
    };

    write_file(repo, filename, content.as_bytes(), report)?;

    let heads: String = payload
        .new_heads
        .iter()
        .map(|h| format!("{h}\n"))
        .collect();
    write_file(repo, SYNCED_HEADS_FILE, heads.as_bytes(), report)
}
