// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use githgmap::model::{CommitId, ForeignCommitId, MappingEntry};
use githgmap::repository::NodemapDb;
use rustc_hash::FxHashSet;

pub fn local(n: u32) -> CommitId {
    let mut id = [0x11u8; 20];
    id[..4].copy_from_slice(&n.to_be_bytes());
    CommitId(id)
}

pub fn foreign(n: u32) -> ForeignCommitId {
    let mut id = [0xeeu8; 20];
    id[16..].copy_from_slice(&n.to_be_bytes());
    ForeignCommitId(id)
}

/// Mapping entries for commits `0..count`
pub fn generate_entries(count: u32) -> Vec<MappingEntry> {
    (0..count).map(|n| MappingEntry::new(foreign(n), local(n))).collect()
}

/// Mapfile content for commits `0..count`, in commit order
pub fn generate_mapfile(count: u32) -> Vec<u8> {
    generate_entries(count)
        .iter()
        .flat_map(|e| e.to_record().into_bytes())
        .collect()
}

/// The last `missing` commits of a history of `count`, as a peer would ask for them
pub fn tail_commits(count: u32, missing: u32) -> FxHashSet<CommitId> {
    (count - missing..count).map(local).collect()
}

/// In-memory index holding `count` entries
pub async fn setup_bench_db(count: u32) -> NodemapDb {
    let db = NodemapDb::in_memory().await.unwrap();
    db.init_schema().await.unwrap();
    db.insert_entries_with_callback(&generate_entries(count), |_| {})
        .await
        .unwrap();
    db
}
