//! Git inspection for the repository being scheduled.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScheduleError};

/// Only HTTPS GitHub remotes may be scheduled.
pub const GITHUB_HTTPS_PREFIX: &str = "https://github.com";

/// Remote consulted for the repository URL.
pub const DEFAULT_REMOTE: &str = "origin";

/// Identity of the checked-out revision, detached from the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReference {
    /// Web URL of the repository (no `.git` suffix)
    pub remote_url: String,
    pub branch_name: String,
    /// Full SHA of the branch tip
    pub commit_hash: String,
}

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| ScheduleError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScheduleError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(ScheduleError::Git(format!(
            "git {} returned empty output",
            args.join(" ")
        )));
    }

    Ok(stdout)
}

/// Turn a remote URL into a plain GitHub web URL.
///
/// Fails with [`ScheduleError::Precondition`] for anything that is not an
/// HTTPS GitHub URL; SSH or other hosts are never rewritten.
pub fn github_http_url(remote_url: &str) -> Result<String> {
    if !remote_url.starts_with(GITHUB_HTTPS_PREFIX) {
        return Err(ScheduleError::Precondition(format!(
            "expected remote to be a GitHub repository (accessed via HTTPS), got '{remote_url}'"
        )));
    }
    Ok(remote_url
        .strip_suffix(".git")
        .unwrap_or(remote_url)
        .to_string())
}

/// Read remote URL, branch and branch tip from the working copy at `repo_dir`.
///
/// The remote is validated before anything else is queried. The URL is the
/// one configured for the remote, without `url.<base>.insteadOf` rewriting.
pub fn inspect_repository(repo_dir: &Path) -> Result<RepositoryReference> {
    let remote_key = format!("remote.{DEFAULT_REMOTE}.url");
    let remote = run_git(repo_dir, &["config", "--get", &remote_key])?;
    let remote_url = github_http_url(&remote)?;

    let head_ref = run_git(repo_dir, &["symbolic-ref", "HEAD"]).map_err(|e| {
        ScheduleError::Git(format!("HEAD does not point at a branch: {e}"))
    })?;
    let branch_name = head_ref
        .strip_prefix("refs/heads/")
        .ok_or_else(|| ScheduleError::Git(format!("HEAD points outside refs/heads: {head_ref}")))?
        .to_string();

    let tip = format!("{head_ref}^{{commit}}");
    let commit_hash = run_git(repo_dir, &["rev-parse", "--verify", &tip])?;

    debug!(remote = %remote_url, branch = %branch_name, commit = %commit_hash, "Inspected repository");

    Ok(RepositoryReference {
        remote_url,
        branch_name,
        commit_hash,
    })
}

/// Top-level directory of the working copy containing `dir`.
pub fn discover_repository_root(dir: &Path) -> Result<PathBuf> {
    run_git(dir, &["rev-parse", "--show-toplevel"]).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo(remote: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]);
        run(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run(dir.path(), &["config", "user.name", "test-user"]);
        run(dir.path(), &["config", "user.email", "test@example.com"]);
        run(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        run(dir.path(), &["remote", "add", "origin", remote]);
        dir
    }

    #[test]
    fn github_http_url_strips_git_suffix() {
        assert_eq!(
            github_http_url("https://github.com/mozilla-mobile/fenix.git").unwrap(),
            "https://github.com/mozilla-mobile/fenix"
        );
    }

    #[test]
    fn github_http_url_keeps_plain_url() {
        assert_eq!(
            github_http_url("https://github.com/mozilla-mobile/fenix").unwrap(),
            "https://github.com/mozilla-mobile/fenix"
        );
    }

    #[test]
    fn github_http_url_rejects_other_transports() {
        for url in [
            "git@github.com:mozilla-mobile/fenix.git",
            "ssh://git@github.com/mozilla-mobile/fenix",
            "http://github.com/mozilla-mobile/fenix",
            "https://gitlab.com/mozilla-mobile/fenix",
        ] {
            let err = github_http_url(url).unwrap_err();
            assert!(
                matches!(err, ScheduleError::Precondition(_)),
                "{url} should be a precondition failure"
            );
        }
    }

    #[test]
    fn inspect_repository_reads_branch_and_tip() {
        let repo = make_git_repo("https://github.com/mozilla-mobile/fenix.git");
        let reference = inspect_repository(repo.path()).unwrap();

        assert_eq!(reference.remote_url, "https://github.com/mozilla-mobile/fenix");
        assert_eq!(reference.branch_name, "main");
        assert_eq!(reference.commit_hash.len(), 40);
        assert!(reference.commit_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn inspect_repository_reads_configured_url_not_rewritten_one() {
        let repo = make_git_repo("https://github.com/mozilla-mobile/fenix.git");
        run(
            repo.path(),
            &["config", "url.git@github.com:.insteadOf", "https://github.com/"],
        );

        let reference = inspect_repository(repo.path()).unwrap();
        assert_eq!(reference.remote_url, "https://github.com/mozilla-mobile/fenix");
    }

    #[test]
    fn inspect_repository_rejects_ssh_remote_rewritten_to_https() {
        let repo = make_git_repo("git@github.com:mozilla-mobile/fenix.git");
        run(
            repo.path(),
            &["config", "url.https://github.com/.insteadOf", "git@github.com:"],
        );

        let err = inspect_repository(repo.path()).unwrap_err();
        assert!(matches!(err, ScheduleError::Precondition(_)));
    }

    #[test]
    fn inspect_repository_with_tag_named_like_branch() {
        let repo = make_git_repo("https://github.com/mozilla-mobile/fenix");
        run(repo.path(), &["tag", "main"]);

        let reference = inspect_repository(repo.path()).unwrap();
        assert_eq!(reference.branch_name, "main");
        let head = StdCommand::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(repo.path())
            .output()
            .unwrap();
        assert_eq!(
            reference.commit_hash,
            String::from_utf8_lossy(&head.stdout).trim()
        );
    }

    #[test]
    fn inspect_repository_checks_remote_before_branch() {
        let repo = make_git_repo("git@github.com:mozilla-mobile/fenix.git");
        run(repo.path(), &["checkout", "--detach"]);

        let err = inspect_repository(repo.path()).unwrap_err();
        assert!(matches!(err, ScheduleError::Precondition(_)));
    }

    #[test]
    fn inspect_repository_rejects_detached_head() {
        let repo = make_git_repo("https://github.com/mozilla-mobile/fenix");
        run(repo.path(), &["checkout", "--detach"]);

        let err = inspect_repository(repo.path()).unwrap_err();
        assert!(matches!(err, ScheduleError::Git(_)));
    }

    #[test]
    fn inspect_repository_fails_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]);
        assert!(matches!(
            inspect_repository(dir.path()),
            Err(ScheduleError::Git(_))
        ));
    }

    #[test]
    fn discover_repository_root_from_subdirectory() {
        let repo = make_git_repo("https://github.com/mozilla-mobile/fenix");
        let nested = repo.path().join("automation").join("taskcluster");
        std::fs::create_dir_all(&nested).unwrap();

        let root = discover_repository_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }
}
