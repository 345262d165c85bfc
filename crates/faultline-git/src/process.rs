//! Bounded subprocess execution of the `git` binary.
//!
//! Every invocation holds a semaphore permit while the process runs, so
//! concurrent analyses cannot exhaust process-table or file-descriptor
//! limits on the host. Non-zero exits are classified into stable error
//! codes by an ordered rule list over the captured stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use faultline_core::{GitError, GitErrorCode};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

/// Runs git commands against one working copy.
///
/// The semaphore is shared with the rest of the pipeline and injected by
/// the composition root; a safe default is 6 permits.
pub struct GitRunner {
    repo: PathBuf,
    permits: Arc<Semaphore>,
}

impl GitRunner {
    /// Create a runner for the working copy at `repo`.
    pub fn new(repo: impl Into<PathBuf>, permits: Arc<Semaphore>) -> Self {
        Self {
            repo: repo.into(),
            permits,
        }
    }

    /// The working copy this runner operates on.
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Run `git <args>` and return its stdout as text.
    ///
    /// `operation` names the accessor operation for error reporting and
    /// appears unchanged in the resulting [`GitError`].
    ///
    /// # Errors
    ///
    /// Returns a classified [`GitError`] when the process cannot be
    /// spawned or exits non-zero.
    pub async fn run(&self, operation: &'static str, args: &[&str]) -> Result<String, GitError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            GitError::new(GitErrorCode::OperationFailed, operation, "semaphore closed")
        })?;

        debug!(operation, ?args, "running git");

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                GitError::new(
                    GitErrorCode::OperationFailed,
                    operation,
                    format!("failed to spawn git: {e}"),
                )
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify(operation, stderr.trim()))
        }
    }
}

/// Classify a git failure message into a stable error code.
///
/// Best-effort pattern matching over the diagnostic text, evaluated top
/// to bottom; the first matching rule wins and anything unmatched falls
/// through to `operation-failed`.
///
/// # Examples
///
/// ```
/// use faultline_core::GitErrorCode;
/// use faultline_git::process::classify;
///
/// let err = classify("log", "fatal: not a git repository (or any parent)");
/// assert_eq!(err.code, GitErrorCode::RepositoryNotFound);
/// ```
pub fn classify(operation: &'static str, stderr: &str) -> GitError {
    let haystack = stderr.to_lowercase();

    const RULES: &[(&[&str], GitErrorCode)] = &[
        (&["not a git repository"], GitErrorCode::RepositoryNotFound),
        (
            &[
                "unknown revision",
                "bad revision",
                "ambiguous argument",
                "invalid object name",
                "bad object",
                "needed a single revision",
            ],
            GitErrorCode::InvalidReference,
        ),
        (
            &["needs merge", "merge conflict", "unmerged files"],
            GitErrorCode::MergeConflict,
        ),
        (
            &["would be overwritten", "uncommitted changes", "commit your changes"],
            GitErrorCode::UncommittedChanges,
        ),
        (
            &[
                "authentication failed",
                "permission denied",
                "could not read username",
            ],
            GitErrorCode::AuthenticationFailed,
        ),
        (
            &["index.lock", "unable to lock", "cannot lock ref"],
            GitErrorCode::LockContention,
        ),
        (
            &[
                "did not match any",
                "invalid path",
                "does not exist in",
                "exists on disk, but not in",
                "is outside repository",
            ],
            GitErrorCode::InvalidPath,
        ),
        (
            &[
                "could not resolve host",
                "unable to access",
                "connection refused",
                "connection timed out",
                "remote hung up",
                "early eof",
            ],
            GitErrorCode::RemoteError,
        ),
    ];

    for (needles, code) in RULES {
        if needles.iter().any(|n| haystack.contains(n)) {
            return GitError::new(*code, operation, stderr);
        }
    }

    GitError::new(GitErrorCode::OperationFailed, operation, stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_repository() {
        let err = classify("diff-stats", "fatal: not a git repository (or any of the parent directories): .git");
        assert_eq!(err.code, GitErrorCode::RepositoryNotFound);
        assert_eq!(err.operation, "diff-stats");
    }

    #[test]
    fn classifies_unknown_revision() {
        let err = classify(
            "content-at",
            "fatal: ambiguous argument 'nope': unknown revision or path not in the working tree.",
        );
        assert_eq!(err.code, GitErrorCode::InvalidReference);
    }

    #[test]
    fn classifies_missing_path() {
        let err = classify("content-at", "fatal: path 'src/gone.rs' does not exist in 'HEAD'");
        assert_eq!(err.code, GitErrorCode::InvalidPath);
    }

    #[test]
    fn classifies_lock_contention() {
        let err = classify(
            "log",
            "fatal: Unable to create '/repo/.git/index.lock': File exists.",
        );
        assert_eq!(err.code, GitErrorCode::LockContention);
    }

    #[test]
    fn classifies_authentication() {
        let err = classify("log", "fatal: Authentication failed for 'https://example.com/repo.git'");
        assert_eq!(err.code, GitErrorCode::AuthenticationFailed);
    }

    #[test]
    fn classifies_remote_failures() {
        let err = classify("log", "fatal: unable to access 'https://example.com/': Could not resolve host");
        assert_eq!(err.code, GitErrorCode::RemoteError);
    }

    #[test]
    fn rules_apply_in_order() {
        // A message mentioning both a revision and a path problem takes the
        // earlier rule.
        let err = classify(
            "content-at",
            "fatal: bad revision 'x'; pathspec 'y' did not match any files",
        );
        assert_eq!(err.code, GitErrorCode::InvalidReference);
    }

    #[test]
    fn unmatched_text_falls_through() {
        let err = classify("log", "fatal: something nobody has seen before");
        assert_eq!(err.code, GitErrorCode::OperationFailed);
        assert!(err.message.contains("nobody has seen"));
    }

    #[test]
    fn original_diagnostic_text_is_preserved() {
        let original = "fatal: Needed a single revision";
        let err = classify("rev-parse", original);
        assert_eq!(err.message, original);
    }
}
