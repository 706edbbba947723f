//! SQLite implementation of NodemapStore

use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::model::{CommitId, ForeignCommitId, MappingEntry};
use crate::repository::NodemapDb;

use super::progress::{BuildPhase, ProgressReporter};
use super::store::NodemapStore;

impl NodemapStore for NodemapDb {
    async fn lookup_local(&self, foreign: &ForeignCommitId) -> Result<Option<CommitId>> {
        self.local_for(foreign).await
    }

    async fn lookup_foreign(&self, local: &CommitId) -> Result<Option<ForeignCommitId>> {
        self.foreign_for(local).await
    }

    async fn load_indexed(&self) -> Result<FxHashSet<CommitId>> {
        self.load_local_ids().await
    }

    async fn apply_entries(
        &self,
        entries: &[MappingEntry],
        progress: &dyn ProgressReporter,
    ) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }
        let pb = progress.phase(BuildPhase::Index, entries.len() as u64);
        let inserted = self
            .insert_entries_with_callback(entries, |n| pb.inc(n as u64))
            .await?;
        pb.finish();
        Ok(inserted)
    }
}
