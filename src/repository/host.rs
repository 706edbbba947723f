//! Host repository capabilities
//!
//! The mapping code never owns history. Everything it needs from the
//! repository it serves goes through this trait, so it can run against a
//! real on-disk repository or a fixture.

use crate::error::Result;
use crate::model::{CommitId, ForeignCommitId};

use super::store::{MetaStore, RepoLock};

/// Commit extra recording the foreign hash at conversion time
pub const CONVERT_REVISION_EXTRA: &str = "convert_revision";

pub trait HostRepo {
    /// Repository-local metadata files
    fn store(&self) -> &MetaStore;

    /// Number of revisions in local history
    fn history_len(&self) -> usize;

    /// Commit id of revision `rev` (`rev < history_len()`)
    fn node(&self, rev: usize) -> Result<CommitId>;

    /// Raw `convert_revision` extra of a commit, if recorded
    fn convert_revision(&self, id: &CommitId) -> Result<Option<String>>;

    /// Resolve a user-facing name to a commit.
    ///
    /// Must fail with [`Error::UnknownRevision`](crate::Error::UnknownRevision)
    /// when the name simply does not exist; any other error is treated as a
    /// genuine repository failure.
    fn resolve(&self, name: &str) -> Result<CommitId>;

    /// Current head commits
    fn heads(&self) -> Result<Vec<CommitId>>;

    fn is_known(&self, id: &CommitId) -> bool;

    /// Commits reachable from `heads` but not from `common`
    fn find_missing(&self, common: &[CommitId], heads: &[CommitId]) -> Result<Vec<CommitId>>;

    /// Exclusive repository write lock
    fn lock(&self) -> Result<RepoLock> {
        self.store().lock()
    }

    /// Foreign id recorded in a commit's extras, if it is a full hash
    fn foreign_id(&self, id: &CommitId) -> Result<Option<ForeignCommitId>> {
        Ok(self
            .convert_revision(id)?
            .and_then(|hex| ForeignCommitId::from_hex(&hex).ok()))
    }

    fn all_known(&self, ids: &[CommitId]) -> bool {
        ids.iter().all(|id| self.is_known(id))
    }
}
