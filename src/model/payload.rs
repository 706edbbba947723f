//! Delta payload carried by the `fb:gitmeta:githgmap` part

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Missing mapfile data sent from server to client.
///
/// Field names match the JSON body exchanged with existing peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(rename = "needfullsync")]
    pub need_full_sync: bool,
    #[serde(rename = "newheads")]
    pub new_heads: BTreeSet<String>,
    /// Raw 82-byte records, in mapfile order
    #[serde(rename = "missinglines")]
    pub missing_lines: Vec<String>,
}

impl SyncPayload {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::MalformedPayload)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut payload: SyncPayload =
            serde_json::from_slice(data).map_err(Error::MalformedPayload)?;
        let mut seen = BTreeSet::new();
        payload.missing_lines.retain(|line| seen.insert(line.clone()));
        Ok(payload)
    }
}
