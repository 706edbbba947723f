mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use githgmap::config::{self, Config};
use githgmap::lookup::{IdentityResolver, LookupChain};
use githgmap::repository::{GitNodemap, GitRepo, HostRepo, IndicatifProgress};
use githgmap::sync::pull_git_meta;
use githgmap::Error;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn open_repo(path: &std::path::Path) -> Result<(GitRepo, Config)> {
    let repo = GitRepo::open(path)
        .with_context(|| format!("Could not open repository: {}", path.display()))?;
    let config = config::load_for_repo(repo.store().dir())?;
    let repo = repo.with_lock_timeout(Duration::from_secs(config.lock_timeout_secs));
    Ok((repo, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (repo, config) = open_repo(&cli.repo_path)?;

    match cli.command {
        Command::Lookup { keys } => {
            let mut resolver = IdentityResolver::new(&repo, &config);
            let mut chain = LookupChain::new(&mut resolver, |name: &str| match repo.resolve(name) {
                Ok(id) => Ok(format!("1 {}\n", id)),
                Err(Error::UnknownRevision(_)) => Ok(format!("0 unknown revision '{}'\n", name)),
                Err(e) => Err(e),
            });
            for key in &keys {
                print!("{}", chain.lookup(key).await?);
            }
        }
        Command::Debugbuildgitnodemap => {
            let mut nodemap = GitNodemap::open(&repo)
                .await
                .context("Failed to open git nodemap")?;
            let report = nodemap.build(&repo, &config, &IndicatifProgress).await?;
            println!("{} new commits are indexed", report.revisions_scanned);
        }
        Command::Gitgetmeta { source } => {
            let source = source
                .or_else(|| config.default_source.clone())
                .ok_or_else(|| Error::Config("no source given and [paths] default is not set".into()))?;
            let (peer, peer_config) = open_repo(&source)?;
            eprintln!("getting git metadata from {}", source.display());
            let report = pull_git_meta(&repo, &peer, &peer_config)?;
            println!("wrote {} files ({} bytes)", report.files(), report.bytes());
        }
    }

    Ok(())
}
