//! Version-control operations backed by `git2`.
use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, Cred, CredentialType, Direction, FetchOptions, Remote, RemoteCallbacks,
    Repository,
};

use crate::error::GitError;

/// Give up on authentication after this many callback invocations; libgit2
/// keeps asking as long as the callback returns a credential.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut attempts = 0usize;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::SSH_KEY)
            && let Some(user) = username
        {
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Ok(config) = git2::Config::open_default()
        {
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });
    callbacks
}

/// Short name of the branch the remote's `HEAD` points to.
///
/// # Errors
///
/// Returns the libgit2 error if the remote cannot be contacted or does not
/// advertise a symbolic `HEAD`.
pub fn default_branch(url: &str) -> Result<String, git2::Error> {
    let mut remote = Remote::create_detached(url)?;
    let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks()), None)?;
    let head = connection.default_branch()?;
    let name = head
        .as_str()
        .ok_or_else(|| git2::Error::from_str("default branch is not valid UTF-8"))?;
    Ok(name.strip_prefix("refs/heads/").unwrap_or(name).to_string())
}

/// Clone `url` into `dest`.
///
/// Only one branch is fetched and checked out: `branch`, or the remote's
/// default branch.  When the default branch cannot be determined every
/// branch is fetched and the remote `HEAD` checked out.  `all_tags` downloads every tag, which a tag
/// pin needs when the tag is not reachable from the fetched branch tip.
///
/// # Errors
///
/// Returns [`GitError::Clone`] if the clone fails.
pub fn clone(
    url: &str,
    dest: &Path,
    branch: Option<&str>,
    all_tags: bool,
) -> Result<Repository, GitError> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks());
    if all_tags {
        fetch.download_tags(AutotagOption::All);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);
    let branch = branch
        .map(str::to_string)
        .or_else(|| default_branch(url).ok());
    if let Some(branch) = &branch {
        let branch_name = branch.clone();
        builder.branch(branch);
        builder.remote_create(move |repo, name, url| {
            let refspec = format!("+refs/heads/{branch_name}:refs/remotes/{name}/{branch_name}");
            repo.remote_with_fetch(name, url, &refspec)
        });
    }

    builder.clone(url, dest).map_err(|source| GitError::Clone {
        url: url.to_string(),
        source,
    })
}

/// Check out `reference` (a ref name or a full/abbreviated commit id) and
/// detach `HEAD` at the commit it points to.
///
/// # Errors
///
/// Returns [`GitError::Checkout`] if the reference does not resolve to a
/// commit or the working tree cannot be updated.
pub fn checkout_detached(repo: &Repository, reference: &str) -> Result<(), GitError> {
    let checkout = || -> Result<(), git2::Error> {
        let commit = repo.revparse_single(reference)?.peel_to_commit()?;
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        repo.set_head_detached(commit.id())
    };
    checkout().map_err(|source| GitError::Checkout {
        reference: reference.to_string(),
        source,
    })
}

/// Full id of the commit `HEAD` points to.
///
/// # Errors
///
/// Returns [`GitError::Head`] if `HEAD` is unborn or cannot be peeled.
pub fn head_commit(repo: &Repository) -> Result<String, GitError> {
    repo.head()
        .and_then(|head| head.peel_to_commit())
        .map(|commit| commit.id().to_string())
        .map_err(GitError::Head)
}

/// Initialise an empty repository at `path`, creating the directory if
/// needed.
///
/// # Errors
///
/// Returns [`GitError::Init`] if libgit2 cannot create the repository.
pub fn init(path: &Path) -> Result<(), GitError> {
    Repository::init(path)
        .map(drop)
        .map_err(|source| GitError::Init {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove `relative` from the index of the repository at `root`, leaving the
/// working tree alone (`git rm --cached`).
///
/// Returns `false` when `root` is not a repository.
///
/// # Errors
///
/// Returns [`GitError::Index`] if the index cannot be read or written.
pub fn untrack(root: &Path, relative: &Path) -> Result<bool, GitError> {
    let Ok(repo) = Repository::open(root) else {
        return Ok(false);
    };
    let mut index = repo.index().map_err(GitError::Index)?;
    if index.get_path(relative, 0).is_none() {
        return Ok(true);
    }
    index.remove_path(relative).map_err(GitError::Index)?;
    index.write().map_err(GitError::Index)?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Oid, Signature};

    fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("quack", "quack@example.invalid").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Source repository with two commits; `v1.0` tags the first.
    fn source_repo() -> (tempfile::TempDir, Oid, Oid) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("version.txt"), "1").unwrap();
        let first = commit_all(&repo, "first");
        let object = repo.find_object(first, None).unwrap();
        repo.tag_lightweight("v1.0", &object, false).unwrap();
        std::fs::write(dir.path().join("version.txt"), "2").unwrap();
        let second = commit_all(&repo, "second");
        (dir, first, second)
    }

    fn url(dir: &tempfile::TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn clone_default_branch_and_read_head() {
        let (src, _, second) = source_repo();
        let dst = tempfile::tempdir().unwrap();
        let repo = clone(&url(&src), &dst.path().join("clone"), None, false).unwrap();
        assert_eq!(head_commit(&repo).unwrap(), second.to_string());
        assert_eq!(
            std::fs::read_to_string(dst.path().join("clone/version.txt")).unwrap(),
            "2"
        );
    }

    #[test]
    fn clone_without_branch_fetches_only_the_default_branch() {
        let (src, _, _) = source_repo();
        let source = Repository::open(src.path()).unwrap();
        let head = source.head().unwrap().peel_to_commit().unwrap();
        source.branch("side", &head, false).unwrap();
        let default = default_branch(&url(&src)).unwrap();
        assert_eq!(
            Some(default.as_str()),
            source.head().unwrap().shorthand()
        );

        let dst = tempfile::tempdir().unwrap();
        let repo = clone(&url(&src), &dst.path().join("clone"), None, false).unwrap();

        assert!(repo.find_reference(&format!("refs/remotes/origin/{default}")).is_ok());
        assert!(repo.find_reference("refs/remotes/origin/side").is_err());
    }

    #[test]
    fn checkout_tag_detaches_at_tagged_commit() {
        let (src, first, _) = source_repo();
        let dst = tempfile::tempdir().unwrap();
        let repo = clone(&url(&src), &dst.path().join("clone"), None, true).unwrap();
        checkout_detached(&repo, "refs/tags/v1.0").unwrap();
        assert!(repo.head_detached().unwrap());
        assert_eq!(head_commit(&repo).unwrap(), first.to_string());
        assert_eq!(
            std::fs::read_to_string(dst.path().join("clone/version.txt")).unwrap(),
            "1"
        );
    }

    #[test]
    fn checkout_abbreviated_commit() {
        let (src, first, _) = source_repo();
        let dst = tempfile::tempdir().unwrap();
        let repo = clone(&url(&src), &dst.path().join("clone"), None, false).unwrap();
        let short = first.to_string()[..10].to_string();
        checkout_detached(&repo, &short).unwrap();
        assert_eq!(head_commit(&repo).unwrap(), first.to_string());
    }

    #[test]
    fn checkout_unknown_reference_fails() {
        let (src, _, _) = source_repo();
        let dst = tempfile::tempdir().unwrap();
        let repo = clone(&url(&src), &dst.path().join("clone"), None, false).unwrap();
        let err = checkout_detached(&repo, "refs/tags/v9.9").unwrap_err();
        assert!(matches!(err, GitError::Checkout { .. }));
    }

    #[test]
    fn clone_missing_repository_fails() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("no-such-repo");
        let err = clone(&missing.to_string_lossy(), &dst.path().join("clone"), None, false)
            .err()
            .unwrap();
        assert!(matches!(err, GitError::Clone { .. }));
    }

    #[test]
    fn init_then_untrack() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        std::fs::write(dir.path().join(".gitmodules"), "[submodule \"x\"]").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(".gitmodules")).unwrap();
        index.write().unwrap();

        assert!(untrack(dir.path(), Path::new(".gitmodules")).unwrap());

        let index = Repository::open(dir.path()).unwrap().index().unwrap();
        assert!(index.get_path(Path::new(".gitmodules"), 0).is_none());
        assert!(dir.path().join(".gitmodules").exists(), "working tree untouched");
    }

    #[test]
    fn untrack_outside_repository_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!untrack(dir.path(), Path::new(".gitmodules")).unwrap());
    }
}
