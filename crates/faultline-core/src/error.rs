use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable machine-readable code attached to every failed git operation.
///
/// Callers branch on the code; the human-readable message is free text
/// captured from the underlying tool and must never be parsed.
///
/// # Examples
///
/// ```
/// use faultline_core::GitErrorCode;
///
/// assert_eq!(GitErrorCode::InvalidReference.as_str(), "invalid-reference");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitErrorCode {
    /// The working copy is not a git repository.
    RepositoryNotFound,
    /// A ref did not resolve to a commit.
    InvalidReference,
    /// The operation ran into an unresolved merge.
    MergeConflict,
    /// Local modifications blocked the operation.
    UncommittedChanges,
    /// Remote rejected the credentials.
    AuthenticationFailed,
    /// Another process holds the index lock.
    LockContention,
    /// A pathspec matched nothing or was malformed.
    InvalidPath,
    /// Network or remote-side failure.
    RemoteError,
    /// Unclassified subprocess failure.
    OperationFailed,
}

impl GitErrorCode {
    /// The stable kebab-case code string.
    pub fn as_str(self) -> &'static str {
        match self {
            GitErrorCode::RepositoryNotFound => "repository-not-found",
            GitErrorCode::InvalidReference => "invalid-reference",
            GitErrorCode::MergeConflict => "merge-conflict",
            GitErrorCode::UncommittedChanges => "uncommitted-changes",
            GitErrorCode::AuthenticationFailed => "authentication-failed",
            GitErrorCode::LockContention => "lock-contention",
            GitErrorCode::InvalidPath => "invalid-path",
            GitErrorCode::RemoteError => "remote-error",
            GitErrorCode::OperationFailed => "operation-failed",
        }
    }
}

impl fmt::Display for GitErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed git operation: stable code, operation name, and the original
/// diagnostic text from the tool.
///
/// # Examples
///
/// ```
/// use faultline_core::{GitError, GitErrorCode};
///
/// let err = GitError::new(GitErrorCode::InvalidReference, "rev-parse", "unknown revision 'nope'");
/// assert_eq!(err.code, GitErrorCode::InvalidReference);
/// assert!(err.to_string().contains("rev-parse"));
/// ```
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("git {operation} failed ({code}): {message}")]
pub struct GitError {
    /// Machine-stable error code.
    pub code: GitErrorCode,
    /// The accessor operation that failed (e.g. `"diff-stats"`).
    pub operation: String,
    /// Diagnostic text captured from git, trimmed.
    pub message: String,
}

impl GitError {
    /// Create a new error for `operation` with the given code and diagnostic.
    pub fn new(code: GitErrorCode, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur across the Faultline pipeline.
///
/// Library crates use this type directly; the binary crate converts to
/// `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use faultline_core::FaultlineError;
///
/// let err = FaultlineError::Config("missing section".into());
/// assert!(err.to_string().contains("missing section"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FaultlineError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure with a stable code.
    #[error(transparent)]
    Git(#[from] GitError),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FaultlineError {
    /// The stable code for this error, usable in structured output.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline_core::{FaultlineError, GitError, GitErrorCode};
    ///
    /// let err: FaultlineError =
    ///     GitError::new(GitErrorCode::RepositoryNotFound, "log", "not a git repository").into();
    /// assert_eq!(err.code(), "repository-not-found");
    /// ```
    pub fn code(&self) -> &'static str {
        match self {
            FaultlineError::Io(_) => "io",
            FaultlineError::Config(_) => "config",
            FaultlineError::Git(err) => err.code.as_str(),
            FaultlineError::Serialization(_) => "serialization",
            FaultlineError::Toml(_) => "toml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FaultlineError = io_err.into();
        assert!(err.to_string().contains("gone"));
        assert_eq!(err.code(), "io");
    }

    #[test]
    fn git_error_carries_code_and_operation() {
        let err = GitError::new(GitErrorCode::LockContention, "diff-stats", "index.lock exists");
        let text = err.to_string();
        assert!(text.contains("diff-stats"));
        assert!(text.contains("lock-contention"));
        assert!(text.contains("index.lock exists"));
    }

    #[test]
    fn git_error_code_is_stable_through_unified_error() {
        let err: FaultlineError =
            GitError::new(GitErrorCode::MergeConflict, "merge-base", "needs merge").into();
        assert_eq!(err.code(), "merge-conflict");
    }

    #[test]
    fn codes_serialize_kebab_case() {
        let json = serde_json::to_string(&GitErrorCode::AuthenticationFailed).unwrap();
        assert_eq!(json, "\"authentication-failed\"");
        let parsed: GitErrorCode = serde_json::from_str("\"remote-error\"").unwrap();
        assert_eq!(parsed, GitErrorCode::RemoteError);
    }

    #[test]
    fn every_code_matches_its_string() {
        let codes = [
            (GitErrorCode::RepositoryNotFound, "repository-not-found"),
            (GitErrorCode::InvalidReference, "invalid-reference"),
            (GitErrorCode::MergeConflict, "merge-conflict"),
            (GitErrorCode::UncommittedChanges, "uncommitted-changes"),
            (GitErrorCode::AuthenticationFailed, "authentication-failed"),
            (GitErrorCode::LockContention, "lock-contention"),
            (GitErrorCode::InvalidPath, "invalid-path"),
            (GitErrorCode::RemoteError, "remote-error"),
            (GitErrorCode::OperationFailed, "operation-failed"),
        ];
        for (code, expected) in codes {
            assert_eq!(code.as_str(), expected);
        }
    }
}
