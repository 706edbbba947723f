//! Persistence seam for the nodemap
//!
//! The build algorithm only needs these operations, so it can be tested
//! against any backing store.

use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::model::{CommitId, ForeignCommitId, MappingEntry};

use super::progress::ProgressReporter;

#[allow(async_fn_in_trait)]
pub trait NodemapStore {
    /// Local id mapped to a foreign id
    async fn lookup_local(&self, foreign: &ForeignCommitId) -> Result<Option<CommitId>>;

    /// Foreign id mapped to a local id
    async fn lookup_foreign(&self, local: &CommitId) -> Result<Option<ForeignCommitId>>;

    /// Every local id already present
    async fn load_indexed(&self) -> Result<FxHashSet<CommitId>>;

    /// Persist new entries atomically, returns how many were new
    async fn apply_entries(
        &self,
        entries: &[MappingEntry],
        progress: &dyn ProgressReporter,
    ) -> Result<u64>;
}
