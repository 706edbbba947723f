//! Pulling git metadata from a peer repository

use crate::config::Config;
use crate::error::Result;
use crate::model::{CommitId, GetMetaRequest, GITMETA_CAPABILITY, SYNCED_HEADS_FILE};
use crate::repository::{HostRepo, MetaStore};

use super::consumer::{apply_parts, ApplyReport};
use super::producer::get_meta_parts;

/// Heads recorded by the last successful pull.
///
/// A missing or unreadable file means nothing is shared yet; lines that
/// are not full hashes are ignored.
pub fn read_common_heads(store: &MetaStore) -> Vec<CommitId> {
    let Some(data) = store.try_read(SYNCED_HEADS_FILE) else {
        return Vec::new();
    };
    String::from_utf8_lossy(&data)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| match CommitId::from_hex(l) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("warning: ignoring bad line in {}: {}", SYNCED_HEADS_FILE, e);
                None
            }
        })
        .collect()
}

/// The request a client sends to receive git metadata
pub fn getmeta_request(repo: &impl HostRepo) -> GetMetaRequest {
    GetMetaRequest {
        bundlecaps: vec![GITMETA_CAPABILITY.to_string()],
        common: read_common_heads(repo.store()),
    }
}

/// Fetch git metadata from `source` (configured with `source_config`) into
/// `local`
pub fn pull_git_meta(
    local: &impl HostRepo,
    source: &impl HostRepo,
    source_config: &Config,
) -> Result<ApplyReport> {
    let request = getmeta_request(local);
    let parts = get_meta_parts(source, source_config, &request)?;
    tracing::debug!("received {} gitmeta parts", parts.len());
    apply_parts(local, &parts)
}
