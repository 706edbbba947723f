//! Names of the repository-local metadata files

/// Flat git -> local mapfile
pub const GIT_MAPFILE: &str = "git-mapfile";
/// Heads the client held after its last metadata sync
pub const SYNCED_HEADS_FILE: &str = "git-synced-hgheads";
/// SQLite nodemap index
pub const NODEMAP_FILE: &str = "git-nodemap";
/// Number of revisions already folded into the nodemap
pub const NODEMAP_LASTREV_FILE: &str = "git-nodemap-lastrev";

/// Every file a peer may send us, in transfer order
pub const GIT_META_FILES: [&str; 4] = [
    GIT_MAPFILE,
    "git-named-branches",
    "git-remote-refs",
    "git-tags",
];

pub fn is_git_meta_file(name: &str) -> bool {
    GIT_META_FILES.contains(&name)
}
