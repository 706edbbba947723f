// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use git2::{Repository, Signature};
use githgmap::model::{CommitId, ForeignCommitId, MappingEntry, GIT_MAPFILE};
use githgmap::repository::{HistoryGraph, HostRepo, MetaStore};
use githgmap::{Error, Result};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Deterministic local id for fixture commit `n`
pub fn local(n: u32) -> CommitId {
    let mut id = [0x11u8; 20];
    id[..4].copy_from_slice(&n.to_be_bytes());
    CommitId(id)
}

/// Deterministic foreign id for fixture commit `n`
pub fn foreign(n: u32) -> ForeignCommitId {
    let mut id = [0xeeu8; 20];
    id[16..].copy_from_slice(&n.to_be_bytes());
    ForeignCommitId(id)
}

pub fn entry(n: u32) -> MappingEntry {
    MappingEntry::new(foreign(n), local(n))
}

/// Mapfile content for fixture commits, in the given order
pub fn mapfile(ns: &[u32]) -> String {
    ns.iter().map(|n| entry(*n).to_record()).collect()
}

/// In-memory host repository with its metadata in a temp directory
pub struct MemoryRepo {
    pub dir: TempDir,
    graph: HistoryGraph,
    extras: FxHashMap<CommitId, String>,
    names: FxHashMap<String, CommitId>,
    store: MetaStore,
}

impl MemoryRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path().join("meta")).with_lock_timeout(Duration::from_secs(5));
        Self {
            dir,
            graph: HistoryGraph::new(),
            extras: FxHashMap::default(),
            names: FxHashMap::default(),
            store,
        }
    }

    /// Linear history of commits `1..=n`, each recording its foreign id
    pub fn linear(n: u32) -> Self {
        let mut repo = Self::new();
        for i in 1..=n {
            let parents: Vec<u32> = if i > 1 { vec![i - 1] } else { vec![] };
            repo.commit(i, &parents, true);
        }
        repo
    }

    /// Add fixture commit `n`; `with_extra` records its foreign id as an extra
    pub fn commit(&mut self, n: u32, parents: &[u32], with_extra: bool) -> CommitId {
        let parents: Vec<CommitId> = parents.iter().map(|p| local(*p)).collect();
        let id = local(n);
        self.graph.add(id, &parents).unwrap();
        if with_extra {
            self.extras.insert(id, foreign(n).to_hex());
        }
        id
    }

    pub fn set_extra(&mut self, n: u32, value: &str) {
        self.extras.insert(local(n), value.to_string());
    }

    pub fn name(&mut self, name: &str, n: u32) {
        self.names.insert(name.to_string(), local(n));
    }

    pub fn write_mapfile(&self, ns: &[u32]) {
        self.store.write_atomic(GIT_MAPFILE, mapfile(ns).as_bytes()).unwrap();
    }

    pub fn read(&self, name: &str) -> Option<String> {
        self.store
            .read(name)
            .unwrap()
            .map(|d| String::from_utf8(d).unwrap())
    }
}

impl HostRepo for MemoryRepo {
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
        Ok(self.extras.get(id).cloned())
    }

    fn resolve(&self, name: &str) -> Result<CommitId> {
        if name == "broken" {
            return Err(Error::Repo("corrupt changelog".to_string()));
        }
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        match CommitId::from_hex(name) {
            Ok(id) if self.graph.contains(&id) => Ok(id),
            _ => Err(Error::UnknownRevision(name.to_string())),
        }
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

/// Create a temporary git repository
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Create a commit on `branch` at `time` (seconds), optionally carrying a
/// `convert_revision` extra header, and point HEAD at `refs/heads/main`
pub fn add_commit(
    repo: &Repository,
    branch: &str,
    parents: &[git2::Oid],
    message: &str,
    time: i64,
    convert_revision: Option<&str>,
) -> git2::Oid {
    let sig = Signature::new("Test User", "test@example.com", &git2::Time::new(time, 0)).unwrap();
    let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parents: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|p| repo.find_commit(*p).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

    let buf = repo
        .commit_create_buffer(&sig, &sig, message, &tree, &parent_refs)
        .unwrap();
    let text = std::str::from_utf8(&buf).unwrap().to_string();
    let content = match convert_revision {
        Some(hex) => {
            let (headers, body) = text.split_once("\n\n").unwrap();
            format!("{}\nconvert_revision {}\n\n{}", headers, hex, body)
        }
        None => text,
    };

    let oid = repo
        .odb()
        .unwrap()
        .write(git2::ObjectType::Commit, content.as_bytes())
        .unwrap();
    repo.reference(&format!("refs/heads/{}", branch), oid, true, message)
        .unwrap();
    repo.set_head("refs/heads/main").unwrap();
    oid
}

pub fn to_commit_id(oid: git2::Oid) -> CommitId {
    CommitId::from_bytes(oid.as_bytes()).unwrap()
}
