//! Version Control Accessor: typed git queries over a bounded subprocess.
//!
//! [`GitAccessor`] retrieves file content at arbitrary refs, per-file diff
//! statistics (single commit or range), commit lists, change-set ranges,
//! and commit metadata. Every call shells out to the `git` binary under a
//! shared semaphore and maps failures to [`faultline_core::GitError`] with
//! a stable code.

pub mod accessor;
pub mod process;

pub use accessor::{ChangeSetRange, CommitMeta, GitAccessor, LogOptions};
pub use process::GitRunner;
