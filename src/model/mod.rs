mod files;
mod ids;
mod part;
mod payload;
mod record;

pub use files::{
    is_git_meta_file, GIT_MAPFILE, GIT_META_FILES, NODEMAP_FILE, NODEMAP_LASTREV_FILE,
    SYNCED_HEADS_FILE,
};
pub use ids::{is_full_hex, CommitId, ForeignCommitId, HEX_LEN, ID_LEN};
pub use part::{BundlePart, GetMetaRequest, PartKind, GITMETA_CAPABILITY};
pub use payload::SyncPayload;
pub use record::{parse_line, parse_record, MappingEntry, RecordError, RecordReader, LOCAL_RANGE, RECORD_LEN};
