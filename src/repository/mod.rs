mod database;
mod git_repo;
mod graph;
mod host;
mod nodemap;
mod store;

pub use database::NodemapDb;
pub use git_repo::{GitRepo, META_DIR};
pub use graph::HistoryGraph;
pub use host::{HostRepo, CONVERT_REVISION_EXTRA};
pub use nodemap::{
    read_last_rev, BuildPhase, BuildReport, GitNodemap, IndicatifProgress, NodemapStore,
    NoopProgress, ProgressHandle, ProgressReporter,
};
pub use store::{MetaStore, RepoLock};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
