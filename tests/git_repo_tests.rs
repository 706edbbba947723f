// On-disk git host tests
// Repositories are written with git2 and read back through gix

mod common;

use common::{add_commit, create_test_repo, foreign, to_commit_id};
use githgmap::config::Config;
use githgmap::lookup::{remote_lookup, Direction, IdentityResolver};
use githgmap::model::GIT_MAPFILE;
use githgmap::repository::{GitNodemap, GitRepo, HostRepo, NoopProgress, META_DIR};
use githgmap::Error;

/// main:    a - b - c
///           \
/// feature:   d
struct Fixture {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    repo: git2::Repository,
    a: git2::Oid,
    b: git2::Oid,
    c: git2::Oid,
    d: git2::Oid,
}

fn fixture() -> Fixture {
    let (dir, path, repo) = create_test_repo();
    let a = add_commit(&repo, "main", &[], "a", 1_000, Some(&foreign(1).to_hex()));
    let b = add_commit(&repo, "main", &[a], "b", 2_000, Some(&foreign(2).to_hex()));
    let c = add_commit(&repo, "main", &[b], "c", 3_000, None);
    let d = add_commit(&repo, "feature", &[a], "d", 4_000, Some(&foreign(4).to_hex()));
    Fixture {
        _dir: dir,
        path,
        repo,
        a,
        b,
        c,
        d,
    }
}

#[test]
fn test_history_is_parents_first() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();
    assert_eq!(repo.history_len(), 4);

    let graph = repo.graph();
    for oid in [fx.a, fx.b, fx.c, fx.d] {
        let commit = fx.repo.find_commit(oid).unwrap();
        let rev = graph.rev(&to_commit_id(oid)).unwrap();
        for parent in commit.parent_ids() {
            assert!(graph.rev(&to_commit_id(parent)).unwrap() < rev);
        }
    }
    assert_eq!(repo.node(0).unwrap(), to_commit_id(fx.a));
}

#[test]
fn test_heads_are_branch_tips() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();

    let mut heads = repo.heads().unwrap();
    heads.sort();
    let mut expected = vec![to_commit_id(fx.c), to_commit_id(fx.d)];
    expected.sort();
    assert_eq!(heads, expected);
}

#[test]
fn test_convert_revision_extra() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();

    assert_eq!(
        repo.convert_revision(&to_commit_id(fx.b)).unwrap(),
        Some(foreign(2).to_hex())
    );
    assert_eq!(repo.convert_revision(&to_commit_id(fx.c)).unwrap(), None);
    assert_eq!(repo.foreign_id(&to_commit_id(fx.d)).unwrap(), Some(foreign(4)));
}

#[test]
fn test_resolve_names() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();

    assert_eq!(repo.resolve("main").unwrap(), to_commit_id(fx.c));
    assert_eq!(repo.resolve("feature").unwrap(), to_commit_id(fx.d));
    assert_eq!(repo.resolve(&fx.b.to_string()).unwrap(), to_commit_id(fx.b));
    assert!(matches!(repo.resolve("no-such-branch"), Err(Error::UnknownRevision(_))));
}

#[test]
fn test_broken_ref_is_a_repository_error() {
    let fx = fixture();
    let tags = fx.path.join(".git").join("refs").join("tags");
    std::fs::create_dir_all(&tags).unwrap();
    std::fs::write(tags.join("broken"), "zzzz-not-an-object-id\n").unwrap();
    let repo = GitRepo::open(&fx.path).unwrap();

    assert!(matches!(repo.resolve("broken"), Err(Error::Repo(_))));
    // Names that simply do not exist are still ordinary misses
    assert!(matches!(repo.resolve("missing"), Err(Error::UnknownRevision(_))));
    assert!(matches!(
        repo.resolve(&foreign(9).to_hex()),
        Err(Error::UnknownRevision(_))
    ));
}

#[tokio::test]
async fn test_broken_ref_aborts_lookup() {
    let fx = fixture();
    let tags = fx.path.join(".git").join("refs").join("tags");
    std::fs::create_dir_all(&tags).unwrap();
    std::fs::write(tags.join("broken"), "zzzz-not-an-object-id\n").unwrap();
    let repo = GitRepo::open(&fx.path).unwrap();
    let config = Config::default();
    let mut resolver = IdentityResolver::new(&repo, &config);

    let err = resolver.resolve("broken", Direction::ToForeign).await.unwrap_err();
    assert!(matches!(err, Error::Repo(_)));
}

#[test]
fn test_find_missing_from_branch_point() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();

    let missing = repo
        .find_missing(&[to_commit_id(fx.a)], &repo.heads().unwrap())
        .unwrap();
    assert_eq!(missing.len(), 3);
    assert!(!missing.contains(&to_commit_id(fx.a)));
}

#[test]
fn test_metadata_lives_in_git_dir() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();
    assert!(repo.store().dir().ends_with(std::path::Path::new(".git").join(META_DIR)));
}

#[tokio::test]
async fn test_nodemap_over_git_history() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();
    let config = Config::default();

    let mut nodemap = GitNodemap::open(&repo).await.unwrap();
    let report = nodemap.build(&repo, &config, &NoopProgress).await.unwrap();
    assert_eq!(report.revisions_scanned, 4);
    assert_eq!(report.entries_added, 3);
    assert_eq!(
        nodemap.lookup_local(&foreign(4)).await.unwrap(),
        Some(to_commit_id(fx.d))
    );

    // Newer commit on main; d keeps its number though it is a tip too
    add_commit(&fx.repo, "main", &[fx.c], "e", 5_000, Some(&foreign(5).to_hex()));
    let repo = GitRepo::open(&fx.path).unwrap();
    assert_eq!(repo.node(3).unwrap(), to_commit_id(fx.d));
    let mut nodemap = GitNodemap::open(&repo).await.unwrap();
    let report = nodemap.build(&repo, &config, &NoopProgress).await.unwrap();
    assert_eq!(report.revisions_scanned, 1);
    assert_eq!(report.entries_added, 1);
    assert!(nodemap.lookup_local(&foreign(5)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_lookup_against_git_repository() {
    let fx = fixture();
    let repo = GitRepo::open(&fx.path).unwrap();
    // c predates extras, only the mapfile knows it
    let record = format!("{} {}\n", foreign(3).to_hex(), to_commit_id(fx.c).to_hex());
    repo.store().write_atomic(GIT_MAPFILE, record.as_bytes()).unwrap();

    let config = Config {
        use_index: true,
        ..Config::default()
    };
    let mut resolver = IdentityResolver::new(&repo, &config);

    // Names only get the extras fast path
    assert_eq!(resolver.resolve("main", Direction::ToForeign).await.unwrap(), None);
    assert_eq!(
        resolver
            .resolve(&fx.c.to_string(), Direction::ToForeign)
            .await
            .unwrap(),
        Some(foreign(3).to_hex())
    );
    assert_eq!(
        resolver.resolve("feature", Direction::ToForeign).await.unwrap(),
        Some(foreign(4).to_hex())
    );

    let key = format!("_gitlookup_git_{}", foreign(1).to_hex());
    let response = remote_lookup(&mut resolver, &key, |_| panic!("default called"))
        .await
        .unwrap();
    assert_eq!(response, format!("1 {}\n", fx.a));
}
