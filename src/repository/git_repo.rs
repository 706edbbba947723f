//! On-disk host backed by gix
//!
//! Local history is every commit reachable from a local branch (or a
//! detached HEAD), numbered parents-first. Among commits whose parents are
//! all numbered, the oldest committer time goes next, then walk order.
//! New commits normally carry later timestamps than everything already
//! numbered, so history that grows keeps its existing numbers.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gix::revision::spec::parse as spec;
use gix::ObjectId;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::model::CommitId;

use super::graph::HistoryGraph;
use super::host::{HostRepo, CONVERT_REVISION_EXTRA};
use super::store::MetaStore;

/// Subdirectory of the git dir holding the mapping files
pub const META_DIR: &str = "gitlookup";

fn repo_err(e: impl std::fmt::Display) -> Error {
    Error::Repo(e.to_string())
}

/// True when `rev_parse_single` failed only because nothing matched.
///
/// Broken refs, object database failures and ambiguous prefixes are real
/// repository errors.
fn single_not_found(err: &spec::single::Error) -> bool {
    match err {
        spec::single::Error::Parse(e) => not_found(e),
        spec::single::Error::RangedRev { .. } => true,
    }
}

fn not_found(err: &spec::Error) -> bool {
    use gix::refs::file::find;
    match err {
        spec::Error::FindReference(find::existing::Error::NotFound { .. })
        | spec::Error::FindReference(find::existing::Error::Find(find::Error::RefnameValidation(_)))
        | spec::Error::PrefixNotFound { .. }
        | spec::Error::SingleNotFound
        | spec::Error::Parse(_) => true,
        // Every alternative that was tried must have missed
        spec::Error::Multi { current, next } => {
            let missed = |e: &(dyn std::error::Error + Send + Sync + 'static)| {
                e.downcast_ref::<spec::Error>().is_some_and(not_found)
            };
            missed(current.as_ref()) && next.as_deref().is_none_or(missed)
        }
        _ => false,
    }
}

fn to_commit_id(oid: &ObjectId) -> Result<CommitId> {
    CommitId::from_bytes(oid.as_bytes())
        .ok_or_else(|| Error::Repo(format!("unsupported object id length for {}", oid)))
}

pub struct GitRepo {
    repo: gix::Repository,
    path: PathBuf,
    graph: HistoryGraph,
    store: MetaStore,
}

impl GitRepo {
    /// Open a repository and load its history
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = gix::open(path)
            .map_err(|e| Error::Repo(format!("failed to open git repository {}: {e}", path.display())))?;
        let store = MetaStore::new(repo.git_dir().join(META_DIR));
        let tips = collect_tips(&repo)?;
        let graph = build_graph(&repo, &tips)?;
        tracing::debug!("loaded {} revisions from {}", graph.len(), path.display());
        Ok(Self {
            repo,
            path: path.to_path_buf(),
            graph,
            store,
        })
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.store = self.store.with_lock_timeout(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph(&self) -> &HistoryGraph {
        &self.graph
    }
}

/// Local branch tips plus HEAD, deduplicated
fn collect_tips(repo: &gix::Repository) -> Result<Vec<ObjectId>> {
    let mut tips = Vec::new();
    let platform = repo.references().map_err(repo_err)?;
    for reference in platform.local_branches().map_err(repo_err)? {
        let mut reference = reference.map_err(repo_err)?;
        let id = reference.peel_to_id_in_place().map_err(repo_err)?.detach();
        if !tips.contains(&id) {
            tips.push(id);
        }
    }
    // Unborn HEAD is fine, detached HEAD counts as a tip
    if let Ok(head) = repo.head_id() {
        let id = head.detach();
        if !tips.contains(&id) {
            tips.push(id);
        }
    }
    Ok(tips)
}

fn build_graph(repo: &gix::Repository, tips: &[ObjectId]) -> Result<HistoryGraph> {
    let mut graph = HistoryGraph::new();
    if tips.is_empty() {
        return Ok(graph);
    }

    // Walk newest first, then reverse so older commits get lower positions
    let mut walked: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
    let mut times: Vec<i64> = Vec::new();
    let walk = repo.rev_walk(tips.iter().copied()).all().map_err(repo_err)?;
    for info in walk {
        let info = info.map_err(repo_err)?;
        let parents = info.parent_ids().map(|id| id.detach()).collect();
        let time = info
            .object()
            .map_err(repo_err)?
            .time()
            .map_err(repo_err)?
            .seconds;
        walked.push((info.id, parents));
        times.push(time);
    }
    walked.reverse();
    times.reverse();

    // Kahn's algorithm keyed by (committer time, walk position)
    let position: FxHashMap<ObjectId, usize> =
        walked.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect();
    let mut pending = vec![0usize; walked.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); walked.len()];
    for (i, (_, parents)) in walked.iter().enumerate() {
        for p in parents {
            if let Some(&pi) = position.get(p) {
                pending[i] += 1;
                children[pi].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(i64, usize)>> = pending
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| Reverse((times[i], i)))
        .collect();
    while let Some(Reverse((_, i))) = ready.pop() {
        let (id, parents) = &walked[i];
        let parents: Vec<CommitId> = parents
            .iter()
            .filter(|p| position.contains_key(*p))
            .map(to_commit_id)
            .collect::<Result<_>>()?;
        graph.add(to_commit_id(id)?, &parents)?;
        for &c in &children[i] {
            pending[c] -= 1;
            if pending[c] == 0 {
                ready.push(Reverse((times[c], c)));
            }
        }
    }

    Ok(graph)
}

impl HostRepo for GitRepo {
    fn store(&self) -> &MetaStore {
        &self.store
    }

    fn history_len(&self) -> usize {
        self.graph.len()
    }

    fn node(&self, rev: usize) -> Result<CommitId> {
        self.graph
            .node(rev)
            .ok_or_else(|| Error::Repo(format!("revision {} out of range", rev)))
    }

    fn convert_revision(&self, id: &CommitId) -> Result<Option<String>> {
        let oid = ObjectId::from(id.0);
        let commit = self.repo.find_commit(oid).map_err(repo_err)?;
        let decoded = commit.decode().map_err(repo_err)?;
        let value = decoded
            .extra_headers()
            .find(CONVERT_REVISION_EXTRA)
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty());
        Ok(value)
    }

    fn resolve(&self, name: &str) -> Result<CommitId> {
        let id = self
            .repo
            .rev_parse_single(name)
            .map_err(|e| {
                if single_not_found(&e) {
                    Error::UnknownRevision(name.to_string())
                } else {
                    Error::Repo(format!("failed to resolve '{}': {}", name, e))
                }
            })?
            .detach();
        let id = to_commit_id(&id)?;
        if !self.graph.contains(&id) {
            return Err(Error::UnknownRevision(name.to_string()));
        }
        Ok(id)
    }

    fn heads(&self) -> Result<Vec<CommitId>> {
        Ok(self.graph.heads())
    }

    fn is_known(&self, id: &CommitId) -> bool {
        self.graph.contains(id)
    }

    fn find_missing(&self, common: &[CommitId], heads: &[CommitId]) -> Result<Vec<CommitId>> {
        Ok(self.graph.find_missing(common, heads))
    }
}
