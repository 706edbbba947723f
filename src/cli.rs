use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "githgmap", about = "Map commit hashes between git and a converted repository")]
pub struct Cli {
    /// Path to the repository
    #[arg(short = 'R', long = "repository", default_value = ".")]
    pub repo_path: PathBuf,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer lookup keys the way the wire command does, one line each
    Lookup {
        /// `_gitlookup_git_<hex>`, `_gitlookup_hg_<hex>` or any revision name
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Build indexes for git <-> local commit translation
    Debugbuildgitnodemap,
    /// Get git metadata from a peer repository
    Gitgetmeta {
        /// Peer repository, defaults to `[paths] default`
        source: Option<PathBuf>,
    },
}
