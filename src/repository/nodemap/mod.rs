//! Git nodemap: incremental bidirectional index
//!
//! Maps local commit ids to foreign ids and back, built from history.
//!
//! # Layers
//!
//! - **store**: persistence trait the build runs against
//! - **db_store**: SQLite implementation of the store
//! - **progress**: per-phase progress reporting (import, scan, index)
//!
//! The watermark (`git-nodemap-lastrev`) counts revisions already folded
//! in. A build only ever scans revisions past it, and only under the
//! repository write lock.

mod db_store;
mod progress;
mod store;

pub use progress::{BuildPhase, IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
pub use store::NodemapStore;

use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    CommitId, ForeignCommitId, MappingEntry, RecordReader, GIT_MAPFILE, NODEMAP_FILE,
    NODEMAP_LASTREV_FILE, RECORD_LEN,
};

use super::database::NodemapDb;
use super::host::HostRepo;
use super::store::MetaStore;

/// What one `build` call did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Revisions scanned past the old watermark; 0 when already current
    pub revisions_scanned: usize,
    /// Rows that were not in the index before
    pub entries_added: u64,
    /// Records read from the flat mapfile on the initial import
    pub imported: usize,
}

impl BuildReport {
    pub fn is_noop(&self) -> bool {
        self.revisions_scanned == 0
    }
}

/// Nodemap for one repository session
pub struct GitNodemap<S = NodemapDb> {
    store: S,
    last_rev: usize,
}

impl GitNodemap<NodemapDb> {
    /// Open the on-disk nodemap of a repository
    pub async fn open(repo: &impl HostRepo) -> Result<Self> {
        let meta = repo.store();
        std::fs::create_dir_all(meta.dir()).map_err(|e| Error::io(meta.dir(), e))?;
        let db = NodemapDb::open(&meta.join(NODEMAP_FILE)).await?;
        let rebuilt = db.init_schema().await?;
        let mut last_rev = read_last_rev(meta)?;
        if rebuilt && last_rev > 0 {
            // Fresh tables: the old watermark no longer describes them
            let _lock = repo.lock()?;
            meta.write_atomic(NODEMAP_LASTREV_FILE, b"0")?;
            last_rev = 0;
        }
        Ok(Self { store: db, last_rev })
    }
}

impl<S: NodemapStore> GitNodemap<S> {
    pub fn with_store(store: S, last_rev: usize) -> Self {
        Self { store, last_rev }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Revisions already indexed, as of the last load or build
    pub fn last_rev(&self) -> usize {
        self.last_rev
    }

    /// Bring the index up to date with local history.
    ///
    /// Assumes history is never truncated. Another process may build
    /// concurrently, so the watermark is re-read once the lock is held.
    pub async fn build(
        &mut self,
        repo: &impl HostRepo,
        config: &Config,
        progress: &dyn ProgressReporter,
    ) -> Result<BuildReport> {
        let repo_len = repo.history_len();
        if self.last_rev >= repo_len {
            return Ok(BuildReport::default());
        }

        let _lock = repo.lock()?;
        self.last_rev = read_last_rev(repo.store())?;
        if self.last_rev >= repo_len {
            return Ok(BuildReport::default());
        }

        let start = Instant::now();
        let mut indexed = self.store.load_indexed().await?;
        let mut pending: Vec<MappingEntry> = Vec::new();
        let mut imported = 0;

        if self.last_rev == 0 {
            let (path, required) = match &config.mapfile {
                Some(path) => (path.clone(), true),
                None => (repo.store().join(GIT_MAPFILE), false),
            };
            if required || path.exists() {
                tracing::info!("importing git nodemap from flat mapfile");
                imported = import_mapfile(&path, &mut indexed, &mut pending, progress)?;
            }
        }

        let revs = self.last_rev..repo_len;
        let scanned = revs.len();
        tracing::info!("building git nodemap for {} commits", scanned);
        let pb = progress.phase(BuildPhase::Scan, scanned as u64);
        for rev in revs {
            pb.inc(1);
            let node = repo.node(rev)?;
            if indexed.contains(&node) {
                continue;
            }
            if let Some(foreign) = repo.foreign_id(&node)? {
                indexed.insert(node);
                pending.push(MappingEntry::new(foreign, node));
            }
        }
        pb.finish();

        let entries_added = self.store.apply_entries(&pending, progress).await?;
        repo.store()
            .write_atomic(NODEMAP_LASTREV_FILE, repo_len.to_string().as_bytes())?;
        self.last_rev = repo_len;

        tracing::debug!(
            "nodemap build: {} revisions, {} new entries in {:?}",
            scanned,
            entries_added,
            start.elapsed()
        );
        Ok(BuildReport {
            revisions_scanned: scanned,
            entries_added,
            imported,
        })
    }

    pub async fn lookup_local(&self, foreign: &ForeignCommitId) -> Result<Option<CommitId>> {
        self.store.lookup_local(foreign).await
    }

    pub async fn lookup_foreign(&self, local: &CommitId) -> Result<Option<ForeignCommitId>> {
        self.store.lookup_foreign(local).await
    }
}

/// Read the persisted watermark; absent means nothing indexed yet
pub fn read_last_rev(meta: &MetaStore) -> Result<usize> {
    let Some(data) = meta.read(NODEMAP_LASTREV_FILE)? else {
        return Ok(0);
    };
    let text = String::from_utf8_lossy(&data);
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(|e| Error::CorruptNodemap {
        file: NODEMAP_LASTREV_FILE.to_string(),
        reason: format!("watermark {:?} is not a number: {}", text, e),
    })
}

/// Queue every record of a flat mapfile not already indexed.
///
/// A local id listed twice with different foreign ids keeps the first
/// one; the disagreement is reported, not fatal.
fn import_mapfile(
    path: &Path,
    indexed: &mut rustc_hash::FxHashSet<CommitId>,
    pending: &mut Vec<MappingEntry>,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    let pb = progress.phase(BuildPhase::Import, len / RECORD_LEN as u64);
    let name = path.display().to_string();
    let mut first_seen: FxHashMap<CommitId, ForeignCommitId> = FxHashMap::default();
    let mut read = 0;
    let mut conflicts = 0;
    for entry in RecordReader::new(BufReader::new(file), name.clone()) {
        let entry = entry?;
        read += 1;
        pb.inc(1);
        match first_seen.get(&entry.local) {
            Some(foreign) if *foreign != entry.foreign => {
                conflicts += 1;
                continue;
            }
            Some(_) => continue,
            None => {
                first_seen.insert(entry.local, entry.foreign);
            }
        }
        if indexed.insert(entry.local) {
            pending.push(entry);
        }
    }
    pb.finish();
    if conflicts > 0 {
        tracing::warn!(
            "warning: {} conflicting records for already mapped commits in {}",
            conflicts,
            name
        );
    }
    Ok(read)
}
