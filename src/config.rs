//! `[gitlookup]` configuration.
//!
//! Layers are read from the user config directory and then from the
//! repository's metadata directory; a later layer overrides individual
//! fields of an earlier one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the per-repository config file inside the metadata directory
pub const REPO_CONFIG_FILE: &str = "gitlookup.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Legacy flat mapfile location; defaults to the repository's `git-mapfile`
    pub mapfile: Option<PathBuf>,
    /// Consult (and build) the nodemap index before scanning the mapfile
    pub use_index: bool,
    /// Serve only the missing part of the mapfile to peers
    pub only_map_delta: bool,
    /// Local commit hashes known to be absent from the mapfile
    pub skip_hashes: Vec<String>,
    pub lock_timeout_secs: u64,
    /// Peer used by `gitgetmeta` when no source is given
    pub default_source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapfile: None,
            use_index: false,
            only_map_delta: false,
            skip_hashes: Vec::new(),
            lock_timeout_secs: 600,
            default_source: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub gitlookup: GitLookupLayer,
    pub paths: PathsLayer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLookupLayer {
    pub mapfile: Option<PathBuf>,
    pub useindex: Option<bool>,
    pub onlymapdelta: Option<bool>,
    pub skiphashes: Option<Vec<String>>,
    pub lock_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsLayer {
    pub default: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn apply_to(self, config: &mut Config) {
        let g = self.gitlookup;
        if let Some(mapfile) = g.mapfile {
            config.mapfile = Some(mapfile);
        }
        if let Some(v) = g.useindex {
            config.use_index = v;
        }
        if let Some(v) = g.onlymapdelta {
            config.only_map_delta = v;
        }
        if let Some(v) = g.skiphashes {
            config.skip_hashes = v;
        }
        if let Some(v) = g.lock_timeout_secs {
            config.lock_timeout_secs = v;
        }
        if let Some(source) = self.paths.default {
            config.default_source = Some(source);
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("githgmap").join("config.toml"))
}

pub fn parse_layer(contents: &str, origin: &Path) -> Result<ConfigLayer> {
    toml::from_str(contents)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", origin.display())))
}

fn load_layer(path: &Path) -> Result<Option<ConfigLayer>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_layer(&contents, path).map(Some)
}

pub fn merge_layers(layers: impl IntoIterator<Item = ConfigLayer>) -> Config {
    let mut config = Config::default();
    for layer in layers {
        layer.apply_to(&mut config);
    }
    config
}

/// Load user + repository configuration for a metadata directory
pub fn load_for_repo(meta_dir: &Path) -> Result<Config> {
    let mut layers = Vec::new();
    if let Some(user) = user_config_path() {
        layers.extend(load_layer(&user)?);
    }
    layers.extend(load_layer(&meta_dir.join(REPO_CONFIG_FILE))?);
    let mut config = merge_layers(layers);
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(raw) = std::env::var("GITLOOKUP_MAPFILE") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.mapfile = Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(raw) = std::env::var("GITLOOKUP_USEINDEX") {
        match raw.trim().parse::<bool>() {
            Ok(v) => config.use_index = v,
            Err(err) => tracing::warn!("invalid GITLOOKUP_USEINDEX, ignoring: {err}"),
        }
    }
}
