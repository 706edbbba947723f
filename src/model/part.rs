//! Bundle parts exchanged during a metadata pull

use super::files::GIT_MAPFILE;

/// Capability a client advertises to receive git metadata
pub const GITMETA_CAPABILITY: &str = "fb_gitmeta";

/// The kinds of part this crate produces and consumes
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PartKind {
    /// Whole file, body is the file content
    GitMeta,
    /// Mapfile delta, body is a JSON [`SyncPayload`](super::SyncPayload)
    GitHgMap,
}

impl PartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartKind::GitMeta => "fb:gitmeta",
            PartKind::GitHgMap => "fb:gitmeta:githgmap",
        }
    }

    /// Accepts both the current and the experimental `b2x:` names
    pub fn parse(name: &str) -> Option<Self> {
        match name.strip_prefix("b2x:").unwrap_or(name) {
            "fb:gitmeta" => Some(PartKind::GitMeta),
            "fb:gitmeta:githgmap" => Some(PartKind::GitHgMap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePart {
    pub kind: PartKind,
    /// Mandatory parameters, in the order they were declared
    pub params: Vec<(String, String)>,
    pub data: Vec<u8>,
}

impl BundlePart {
    pub fn new(kind: PartKind, filename: &str, data: Vec<u8>) -> Self {
        Self {
            kind,
            params: vec![("filename".to_string(), filename.to_string())],
            data,
        }
    }

    pub fn file(filename: &str, data: Vec<u8>) -> Self {
        Self::new(PartKind::GitMeta, filename, data)
    }

    pub fn mapfile_delta(data: Vec<u8>) -> Self {
        Self::new(PartKind::GitHgMap, GIT_MAPFILE, data)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What a client asks the server for
#[derive(Debug, Clone, Default)]
pub struct GetMetaRequest {
    pub bundlecaps: Vec<String>,
    /// Heads the client believes it already shares with the server
    pub common: Vec<super::CommitId>,
}

impl GetMetaRequest {
    pub fn wants_gitmeta(&self) -> bool {
        self.bundlecaps.iter().any(|c| c == GITMETA_CAPABILITY)
    }
}
