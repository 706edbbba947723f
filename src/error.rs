//! Error types for mapping storage, lookup and metadata exchange.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed mapping record at byte {offset} of {file}: {reason}")]
    MalformedRecord {
        file: String,
        offset: u64,
        reason: String,
    },

    #[error("malformed gitmeta payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("gitmeta: invalid mapfile length ({len}) in {file}, not a multiple of {record_len}")]
    InvalidMapfileLength {
        file: String,
        len: u64,
        record_len: usize,
    },

    #[error("gitmeta: missing hashes in file {file} ({missing} of {requested} not found, e.g. {example})")]
    MissingHashes {
        file: String,
        missing: usize,
        requested: usize,
        example: String,
    },

    #[error("corrupt nodemap state in {file}: {reason}")]
    CorruptNodemap { file: String, reason: String },

    #[error("invalid commit id {0:?}: expected 40 hex characters")]
    InvalidId(String),

    #[error("unknown revision '{0}'")]
    UnknownRevision(String),

    #[error("repository error: {0}")]
    Repo(String),

    #[error("gitmeta: '{0}' missing")]
    MissingPartParam(&'static str),

    #[error("gitmeta: unsupported mandatory part parameter '{0}'")]
    UnknownPartParam(String),

    #[error("gitmeta: could not read from {0}")]
    UnreadableMetaFile(String),

    #[error("timed out waiting for lock on {path}{}", holder_note(.holder))]
    LockTimeout { path: PathBuf, holder: Option<u32> },

    #[error("config: {0}")]
    Config(String),

    #[error("nodemap database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn holder_note(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!(" held by process {}", pid),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that mean the mapping data itself is inconsistent.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::MalformedRecord { .. }
                | Error::MalformedPayload(_)
                | Error::InvalidMapfileLength { .. }
                | Error::MissingHashes { .. }
        )
    }
}
