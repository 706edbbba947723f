//! Cross-namespace commit id resolution

use std::io::BufReader;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{is_full_hex, CommitId, ForeignCommitId, RecordReader, GIT_MAPFILE};
use crate::repository::{GitNodemap, HostRepo, NoopProgress, ProgressReporter};

/// Which way a lookup goes
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    /// Foreign (git) hash to local hash
    ToLocal,
    /// Local hash to foreign (git) hash
    ToForeign,
}

/// Resolves ids of one repository, in either direction.
///
/// Strategies, first hit wins: commit extras (local to foreign only), the
/// nodemap index when enabled, then a linear scan of the flat mapfile.
pub struct IdentityResolver<'a, H> {
    repo: &'a H,
    config: &'a Config,
    nodemap: Option<GitNodemap>,
    progress: Box<dyn ProgressReporter>,
}

impl<'a, H: HostRepo> IdentityResolver<'a, H> {
    pub fn new(repo: &'a H, config: &'a Config) -> Self {
        Self {
            repo,
            config,
            nodemap: None,
            progress: Box::new(NoopProgress),
        }
    }

    /// Use an already opened nodemap instead of opening one lazily
    pub fn with_nodemap(mut self, nodemap: GitNodemap) -> Self {
        self.nodemap = Some(nodemap);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn nodemap(&self) -> Option<&GitNodemap> {
        self.nodemap.as_ref()
    }

    /// Resolve `key` to a hex id in the other namespace
    pub async fn resolve(&mut self, key: &str, direction: Direction) -> Result<Option<String>> {
        if direction == Direction::ToForeign {
            match self.repo.resolve(key) {
                Ok(id) => {
                    // Recorded at conversion time, may be ahead of the index
                    if let Some(extra) = self.repo.convert_revision(&id)? {
                        return Ok(Some(extra));
                    }
                }
                Err(Error::UnknownRevision(_)) => {}
                Err(e) => return Err(e),
            }
        }

        // Do not look up uninteresting names like "gfoobar"
        if !is_full_hex(key) {
            return Ok(None);
        }

        if self.config.use_index {
            if let Some(found) = self.lookup_index(key, direction).await? {
                return Ok(found);
            }
        }

        self.scan_mapfile(key, direction)
    }

    /// Index strategy. `Some(answer)` is conclusive, `None` means fall back.
    async fn lookup_index(
        &mut self,
        key: &str,
        direction: Direction,
    ) -> Result<Option<Option<String>>> {
        if self.nodemap.is_none() {
            match GitNodemap::open(self.repo).await {
                Ok(nodemap) => self.nodemap = Some(nodemap),
                Err(e) => {
                    tracing::warn!("failed to open git nodemap: {}", e);
                    return Ok(None);
                }
            }
        }
        let Some(nodemap) = self.nodemap.as_mut() else {
            return Ok(None);
        };

        let up_to_date = match nodemap.build(self.repo, self.config, self.progress.as_ref()).await {
            Ok(_) => true,
            Err(e) => {
                // Not fatal, the flat mapfile still has the answer
                tracing::warn!("failed to update git nodemap: {}", e);
                false
            }
        };

        let found = match direction {
            Direction::ToForeign => {
                let local = CommitId::from_hex(key)?;
                nodemap.lookup_foreign(&local).await.map(|f| f.map(|f| f.to_hex()))
            }
            Direction::ToLocal => {
                let foreign = ForeignCommitId::from_hex(key)?;
                nodemap.lookup_local(&foreign).await.map(|l| l.map(|l| l.to_hex()))
            }
        };
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                // A failed query says nothing about the mapping
                tracing::warn!("git nodemap lookup failed: {}", e);
                return Ok(None);
            }
        };

        match found {
            Some(hex) => Ok(Some(Some(hex))),
            // Complete index, scanning the mapfile would find nothing either
            None if up_to_date => Ok(Some(None)),
            None => Ok(None),
        }
    }

    /// Linear scan of the flat mapfile, can be very slow
    fn scan_mapfile(&self, key: &str, direction: Direction) -> Result<Option<String>> {
        let path = match &self.config.mapfile {
            Some(path) => path.clone(),
            None => self.repo.store().join(GIT_MAPFILE),
        };
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        let reader = RecordReader::new(BufReader::new(file), path.display().to_string());
        match direction {
            Direction::ToLocal => {
                let wanted = ForeignCommitId::from_hex(key)?;
                for entry in reader {
                    let entry = entry?;
                    if entry.foreign == wanted {
                        return Ok(Some(entry.local.to_hex()));
                    }
                }
            }
            Direction::ToForeign => {
                let wanted = CommitId::from_hex(key)?;
                for entry in reader {
                    let entry = entry?;
                    if entry.local == wanted {
                        return Ok(Some(entry.foreign.to_hex()));
                    }
                }
            }
        }
        Ok(None)
    }
}
