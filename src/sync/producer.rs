//! Server side of a git metadata pull

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    BundlePart, CommitId, GetMetaRequest, SyncPayload, GIT_MAPFILE, GIT_META_FILES,
};
use crate::repository::HostRepo;

use super::scan::find_missing_lines;

/// All parts to send for one request, mapfile delta first
pub fn get_meta_parts(
    repo: &impl HostRepo,
    config: &Config,
    request: &GetMetaRequest,
) -> Result<Vec<BundlePart>> {
    if !request.wants_gitmeta() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    if config.only_map_delta {
        if let Some(payload) = mapfile_delta(repo, config, &request.common)? {
            parts.push(BundlePart::mapfile_delta(payload.to_json()?));
        }
    }
    parts.extend(full_file_parts(repo, config));
    Ok(parts)
}

/// Whole-file parts for every metadata file present.
///
/// The mapfile is left out when only deltas of it are served.
pub fn full_file_parts(repo: &impl HostRepo, config: &Config) -> Vec<BundlePart> {
    let mut names: Vec<&str> = GIT_META_FILES.to_vec();
    if config.only_map_delta {
        names.retain(|name| *name != GIT_MAPFILE);
    }
    names.sort_unstable();

    names
        .into_iter()
        .filter_map(|name| {
            let data = repo.store().try_read(name)?;
            Some(BundlePart::file(name, data))
        })
        .collect()
}

/// Mapfile records the client is missing, given the heads it shares with us.
///
/// `None` when this repository has no mapfile. A common head we do not
/// know makes the whole history missing, since we cannot order it.
pub fn mapfile_delta(
    repo: &impl HostRepo,
    config: &Config,
    common: &[CommitId],
) -> Result<Option<SyncPayload>> {
    let Some(content) = repo.store().try_read(GIT_MAPFILE) else {
        return Ok(None);
    };

    let common: &[CommitId] = if repo.all_known(common) {
        common
    } else {
        tracing::info!("client has unknown common heads, sending full git-hg map");
        &[]
    };
    let need_full_sync = common.is_empty();

    let heads = repo.heads()?;
    let new_heads: BTreeSet<String> = heads.iter().map(|h| h.to_hex()).collect();

    let skip: FxHashSet<String> = config
        .skip_hashes
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let wanted: FxHashSet<CommitId> = repo
        .find_missing(common, &heads)?
        .into_iter()
        .filter(|id| !skip.contains(&id.to_hex()))
        .collect();

    let file = repo.store().join(GIT_MAPFILE).display().to_string();
    let found = find_missing_lines(&content, &wanted, &file)?;
    tracing::debug!(
        "gitmeta: {} missing records found after visiting {} records",
        found.lines.len(),
        found.records_visited
    );

    Ok(Some(SyncPayload {
        need_full_sync,
        new_heads,
        missing_lines: found.lines,
    }))
}
