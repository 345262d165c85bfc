//! Version-control queries against a working copy.
//!
//! All operations shell out to the `git` binary through [`GitRunner`] and
//! parse fixed-format output: `--numstat` lines are
//! `insertions<TAB>deletions<TAB>path`, and commit metadata records use
//! `%x1f` field separators. Argument shapes are load-bearing; the parsers
//! depend on them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use faultline_core::{ChangeType, FileChangeRecord, GitError, GitErrorCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::process::GitRunner;

/// Field separator used in metadata record formats.
const FIELD_SEP: char = '\u{1f}';

/// Commit metadata as reported by `git show`/`git log`.
///
/// # Examples
///
/// ```
/// use faultline_git::CommitMeta;
///
/// let meta = CommitMeta {
///     id: "abc123".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: 1_700_000_000,
///     message: "fix: handle empty tree".into(),
/// };
/// assert_eq!(meta.author, "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    /// Full commit id.
    pub id: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    /// First line of the commit message.
    pub message: String,
}

/// A resolved change-set range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetRange {
    /// Merge base or explicit base ref.
    pub base_ref: String,
    /// Head ref of the change set.
    pub head_ref: String,
    /// Commits reachable from head but not base, oldest first.
    pub commits: Vec<String>,
}

/// Filters for [`GitAccessor::log`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Restrict to `base..head`.
    pub range: Option<String>,
    /// Restrict to commits touching this path.
    pub path: Option<String>,
    /// Cap the number of results.
    pub max_count: Option<usize>,
    /// Only commits after this date (passed to git verbatim).
    pub since: Option<String>,
    /// Only commits before this date (passed to git verbatim).
    pub until: Option<String>,
}

/// Executes version-control queries against one working copy.
///
/// Exclude patterns are owned by the accessor and applied to every diff
/// statistic it produces; paths matching any pattern are omitted entirely.
pub struct GitAccessor {
    runner: GitRunner,
    excludes: Vec<glob::Pattern>,
}

impl GitAccessor {
    /// Create an accessor for the working copy at `repo`.
    ///
    /// Invalid exclude patterns are skipped rather than failing
    /// construction.
    pub fn new(
        repo: impl Into<std::path::PathBuf>,
        permits: Arc<Semaphore>,
        exclude_patterns: &[String],
    ) -> Self {
        let mut excludes = Vec::new();
        for pat in exclude_patterns {
            if let Ok(p) = glob::Pattern::new(pat) {
                excludes.push(p);
            }
        }
        Self {
            runner: GitRunner::new(repo, permits),
            excludes,
        }
    }

    /// The working copy this accessor operates on.
    pub fn repo(&self) -> &Path {
        self.runner.repo()
    }

    /// File content as it exists at `reference`.
    ///
    /// A path absent at the reference, or a reference that does not
    /// resolve (a new file, a ref predating the file, a root commit's
    /// parent), yields empty text. Both are normal outcomes, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] for every other failure (missing repository,
    /// lock contention, subprocess trouble).
    pub async fn content_at(&self, reference: &str, path: &str) -> Result<String, GitError> {
        let object = format!("{reference}:{path}");
        match self.runner.run("content-at", &["show", &object]).await {
            Ok(text) => Ok(text),
            Err(err)
                if matches!(
                    err.code,
                    GitErrorCode::InvalidPath | GitErrorCode::InvalidReference
                ) =>
            {
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Per-file change statistics for the change introduced by `reference`
    /// relative to its first parent. A root commit diffs against the empty
    /// tree (`--root`) instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when the reference does not resolve or the
    /// subprocess fails.
    pub async fn diff_stats(&self, reference: &str) -> Result<Vec<FileChangeRecord>, GitError> {
        let numstat = self
            .runner
            .run(
                "diff-stats",
                &[
                    "diff-tree",
                    "--no-commit-id",
                    "--root",
                    "-r",
                    "-M",
                    "--numstat",
                    reference,
                ],
            )
            .await?;
        let status = self
            .runner
            .run(
                "diff-stats",
                &[
                    "diff-tree",
                    "--no-commit-id",
                    "--root",
                    "-r",
                    "-M",
                    "--name-status",
                    reference,
                ],
            )
            .await?;
        Ok(self.merge_stats(&numstat, &status))
    }

    /// Per-file change statistics over the full `base..head` range.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when either reference does not resolve.
    pub async fn range_diff_stats(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<FileChangeRecord>, GitError> {
        let range = format!("{base}..{head}");
        let numstat = self
            .runner
            .run("range-diff-stats", &["diff", "-M", "--numstat", &range])
            .await?;
        let status = self
            .runner
            .run("range-diff-stats", &["diff", "-M", "--name-status", &range])
            .await?;
        Ok(self.merge_stats(&numstat, &status))
    }

    /// Commits reachable from `head` but not `base`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when either reference does not resolve.
    pub async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{base}..{head}");
        let out = self
            .runner
            .run("commits-between", &["rev-list", "--reverse", &range])
            .await?;
        Ok(out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }

    /// Resolve a change-set identifier to a concrete base/head pair and
    /// its commit list.
    ///
    /// Explicit refs win when both are given. Otherwise the head is tried
    /// against the remote-tracking conventions
    /// `refs/remotes/origin/pr/<id>/head` and `refs/remotes/origin/pr/<id>`,
    /// and the base is the merge base of that head and `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns an `invalid-reference` [`GitError`] when neither explicit
    /// refs nor the naming convention resolve.
    pub async fn resolve_change_set_range(
        &self,
        identifier: &str,
        base: Option<&str>,
        head: Option<&str>,
    ) -> Result<ChangeSetRange, GitError> {
        if let (Some(base), Some(head)) = (base, head) {
            let base_ref = self.rev_parse(base).await?;
            let head_ref = self.rev_parse(head).await?;
            let commits = self.commits_between(&base_ref, &head_ref).await?;
            return Ok(ChangeSetRange {
                base_ref,
                head_ref,
                commits,
            });
        }

        let candidates = [
            format!("refs/remotes/origin/pr/{identifier}/head"),
            format!("refs/remotes/origin/pr/{identifier}"),
        ];
        for candidate in &candidates {
            if let Ok(head_ref) = self.rev_parse(candidate).await {
                let base_ref = self
                    .runner
                    .run("merge-base", &["merge-base", &head_ref, "HEAD"])
                    .await?
                    .trim()
                    .to_string();
                let commits = self.commits_between(&base_ref, &head_ref).await?;
                return Ok(ChangeSetRange {
                    base_ref,
                    head_ref,
                    commits,
                });
            }
        }

        Err(GitError::new(
            GitErrorCode::InvalidReference,
            "resolve-change-set",
            format!("change set '{identifier}' resolved neither from explicit refs nor from origin/pr/{identifier}"),
        ))
    }

    /// Metadata for a single commit.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when the reference does not resolve or the
    /// record cannot be parsed.
    pub async fn metadata(&self, reference: &str) -> Result<CommitMeta, GitError> {
        let out = self
            .runner
            .run(
                "metadata",
                &[
                    "show",
                    "-s",
                    "--format=%H%x1f%an%x1f%ae%x1f%ct%x1f%s",
                    reference,
                ],
            )
            .await?;
        parse_meta_line(out.trim()).ok_or_else(|| {
            GitError::new(
                GitErrorCode::OperationFailed,
                "metadata",
                format!("unparseable metadata record: {out:?}"),
            )
        })
    }

    /// Commit metadata for a filtered slice of history.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when the range or path filters do not resolve.
    pub async fn log(&self, options: &LogOptions) -> Result<Vec<CommitMeta>, GitError> {
        let mut args: Vec<String> = vec![
            "log".into(),
            "--format=%H%x1f%an%x1f%ae%x1f%ct%x1f%s".into(),
        ];
        if let Some(max) = options.max_count {
            args.push(format!("--max-count={max}"));
        }
        if let Some(since) = &options.since {
            args.push(format!("--since={since}"));
        }
        if let Some(until) = &options.until {
            args.push(format!("--until={until}"));
        }
        if let Some(range) = &options.range {
            args.push(range.clone());
        }
        if let Some(path) = &options.path {
            args.push("--".into());
            args.push(path.clone());
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.runner.run("log", &arg_refs).await?;
        Ok(out.lines().filter_map(parse_meta_line).collect())
    }

    async fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        self.runner
            .run("rev-parse", &["rev-parse", "--verify", reference])
            .await
            .map(|out| out.trim().to_string())
            .map_err(|err| GitError::new(GitErrorCode::InvalidReference, "rev-parse", err.message))
    }

    fn merge_stats(&self, numstat: &str, name_status: &str) -> Vec<FileChangeRecord> {
        let statuses = parse_name_status(name_status);
        let mut records = Vec::new();

        for line in numstat.lines() {
            let Some(parsed) = parse_numstat_line(line) else {
                continue;
            };
            if self.is_excluded(&parsed.path) {
                continue;
            }

            let (change_type, renamed_from) = match statuses.get(&parsed.path) {
                Some((ct, from)) => (*ct, from.clone()),
                None => (ChangeType::Modified, parsed.renamed_from.clone()),
            };

            records.push(FileChangeRecord {
                path: parsed.path,
                change_type,
                insertions: parsed.insertions,
                deletions: parsed.deletions,
                is_binary: parsed.is_binary,
                renamed_from,
            });
        }

        records
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excludes.iter().any(|p| p.matches(path))
    }
}

struct NumstatLine {
    path: String,
    insertions: u64,
    deletions: u64,
    is_binary: bool,
    renamed_from: Option<String>,
}

/// Parse one `insertions<TAB>deletions<TAB>path` line. Binary files are
/// reported by git as `-<TAB>-<TAB>path` and carry zero counts.
fn parse_numstat_line(line: &str) -> Option<NumstatLine> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 3 {
        return None;
    }

    let is_binary = parts[0] == "-" || parts[1] == "-";
    let insertions = parts[0].parse::<u64>().unwrap_or(0);
    let deletions = parts[1].parse::<u64>().unwrap_or(0);

    // Rename lines arrive either as "old<TAB>new" (diff-tree -M) or as a
    // single "old => new" / "dir/{old => new}" path segment.
    let (path, renamed_from) = if parts.len() >= 4 {
        (parts[3].to_string(), Some(parts[2].to_string()))
    } else {
        extract_rename(parts[2])
    };

    Some(NumstatLine {
        path,
        insertions,
        deletions,
        is_binary,
        renamed_from,
    })
}

/// Extract `(new_path, old_path)` from numstat rename syntax.
fn extract_rename(path_part: &str) -> (String, Option<String>) {
    if let Some(brace_start) = path_part.find('{') {
        if let Some(arrow) = path_part[brace_start..].find(" => ") {
            let arrow_abs = brace_start + arrow;
            if let Some(brace_end) = path_part[arrow_abs..].find('}') {
                let brace_end_abs = arrow_abs + brace_end;
                let prefix = &path_part[..brace_start];
                let suffix = &path_part[brace_end_abs + 1..];
                let old_name = path_part[brace_start + 1..arrow_abs].trim();
                let new_name = path_part[arrow_abs + 4..brace_end_abs].trim();
                let join = |name: &str| {
                    let mut s = format!("{prefix}{name}{suffix}");
                    // "{old => }" style leaves a doubled slash behind.
                    while s.contains("//") {
                        s = s.replace("//", "/");
                    }
                    s
                };
                return (join(new_name), Some(join(old_name)));
            }
        }
    }
    if let Some((old, new)) = path_part.split_once(" => ") {
        return (new.trim().to_string(), Some(old.trim().to_string()));
    }
    (path_part.to_string(), None)
}

/// Parse `--name-status` output into a path-keyed map of change types.
fn parse_name_status(text: &str) -> HashMap<String, (ChangeType, Option<String>)> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 2 {
            continue;
        }
        let status = parts[0];
        match status.chars().next() {
            Some('A') => {
                map.insert(parts[1].to_string(), (ChangeType::Added, None));
            }
            Some('D') => {
                map.insert(parts[1].to_string(), (ChangeType::Deleted, None));
            }
            Some('R') if parts.len() >= 3 => {
                map.insert(
                    parts[2].to_string(),
                    (ChangeType::Renamed, Some(parts[1].to_string())),
                );
            }
            Some('C') if parts.len() >= 3 => {
                map.insert(parts[2].to_string(), (ChangeType::Added, None));
            }
            _ => {
                map.insert(parts[1].to_string(), (ChangeType::Modified, None));
            }
        }
    }
    map
}

fn parse_meta_line(line: &str) -> Option<CommitMeta> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 5 {
        return None;
    }
    Some(CommitMeta {
        id: fields[0].to_string(),
        author: fields[1].to_string(),
        email: fields[2].to_string(),
        timestamp: fields[3].parse().ok()?,
        message: fields[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessor_with_excludes(patterns: &[&str]) -> GitAccessor {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        GitAccessor::new(".", Arc::new(Semaphore::new(1)), &patterns)
    }

    #[test]
    fn numstat_line_parses_counts() {
        let parsed = parse_numstat_line("10\t3\tsrc/main.rs").unwrap();
        assert_eq!(parsed.path, "src/main.rs");
        assert_eq!(parsed.insertions, 10);
        assert_eq!(parsed.deletions, 3);
        assert!(!parsed.is_binary);
    }

    #[test]
    fn binary_numstat_line_has_zero_counts() {
        let parsed = parse_numstat_line("-\t-\tassets/logo.png").unwrap();
        assert!(parsed.is_binary);
        assert_eq!(parsed.insertions, 0);
        assert_eq!(parsed.deletions, 0);
    }

    #[test]
    fn malformed_numstat_lines_are_skipped() {
        assert!(parse_numstat_line("").is_none());
        assert!(parse_numstat_line("10\t3").is_none());
    }

    #[test]
    fn rename_with_brace_syntax_extracts_both_paths() {
        let (new, old) = extract_rename("lib/wal/{io_worker.rs => io.rs}");
        assert_eq!(new, "lib/wal/io.rs");
        assert_eq!(old.unwrap(), "lib/wal/io_worker.rs");
    }

    #[test]
    fn rename_with_arrow_syntax_extracts_both_paths() {
        let (new, old) = extract_rename("old/path.rs => new/path.rs");
        assert_eq!(new, "new/path.rs");
        assert_eq!(old.unwrap(), "old/path.rs");
    }

    #[test]
    fn plain_path_is_not_a_rename() {
        let (path, old) = extract_rename("src/lib.rs");
        assert_eq!(path, "src/lib.rs");
        assert!(old.is_none());
    }

    #[test]
    fn name_status_maps_change_types() {
        let text = "A\tsrc/new.rs\nM\tsrc/edit.rs\nD\tsrc/gone.rs\nR100\tsrc/old.rs\tsrc/moved.rs\n";
        let map = parse_name_status(text);
        assert_eq!(map["src/new.rs"].0, ChangeType::Added);
        assert_eq!(map["src/edit.rs"].0, ChangeType::Modified);
        assert_eq!(map["src/gone.rs"].0, ChangeType::Deleted);
        assert_eq!(map["src/moved.rs"].0, ChangeType::Renamed);
        assert_eq!(map["src/moved.rs"].1.as_deref(), Some("src/old.rs"));
    }

    #[test]
    fn merge_stats_joins_counts_with_status() {
        let accessor = accessor_with_excludes(&[]);
        let records = accessor.merge_stats(
            "5\t0\tsrc/new.rs\n2\t2\tsrc/edit.rs\n0\t9\tsrc/gone.rs\n",
            "A\tsrc/new.rs\nM\tsrc/edit.rs\nD\tsrc/gone.rs\n",
        );
        assert_eq!(records.len(), 3);
        let new = records.iter().find(|r| r.path == "src/new.rs").unwrap();
        assert_eq!(new.change_type, ChangeType::Added);
        assert_eq!(new.insertions, 5);
        let gone = records.iter().find(|r| r.path == "src/gone.rs").unwrap();
        assert_eq!(gone.change_type, ChangeType::Deleted);
        assert_eq!(gone.deletions, 9);
    }

    #[test]
    fn excluded_paths_are_omitted_entirely() {
        let accessor = accessor_with_excludes(&["node_modules/**", "*.lock"]);
        let records = accessor.merge_stats(
            "1\t1\tsrc/main.rs\n900\t0\tnode_modules/pkg/index.js\n3\t3\tCargo.lock\n",
            "M\tsrc/main.rs\nA\tnode_modules/pkg/index.js\nM\tCargo.lock\n",
        );
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs"]);
    }

    #[test]
    fn invalid_exclude_patterns_are_skipped() {
        let accessor = accessor_with_excludes(&["[bad"]);
        let records = accessor.merge_stats("1\t0\tsrc/a.rs\n", "M\tsrc/a.rs\n");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn meta_line_round_trips() {
        let line = format!(
            "abc123{sep}alice{sep}alice@example.com{sep}1700000000{sep}fix: things",
            sep = FIELD_SEP
        );
        let meta = parse_meta_line(&line).unwrap();
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.timestamp, 1_700_000_000);
        assert_eq!(meta.message, "fix: things");
    }

    #[test]
    fn garbage_meta_lines_are_rejected() {
        assert!(parse_meta_line("").is_none());
        assert!(parse_meta_line("just-a-hash").is_none());
    }
}
