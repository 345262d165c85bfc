//! Commit and change-set aggregation of per-file analyses.
//!
//! A commit's files are analyzed in parallel under a bounded worker pool
//! and merged by path key, so the result is independent of completion
//! order. A change set aggregates from a single base→head diff; summed
//! per-commit metrics never feed the aggregate, only the cumulative
//! churn statistic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use faultline_core::{FaultlineError, FileChangeRecord, ImpactLevel};
use faultline_git::GitAccessor;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::engine::{ChangeAnalyzer, FileAnalysis};
use crate::hotspots::{HotspotReport, HotspotTracker, ScanOptions};

/// Risk assessment for one commit.
///
/// # Examples
///
/// ```
/// use faultline_analysis::aggregate::CommitAnalysis;
///
/// let analysis = CommitAnalysis::empty("abc123");
/// assert_eq!(analysis.impact_score, 0.0);
/// assert!(analysis.recommendations.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAnalysis {
    /// The analyzed commit.
    pub commit_id: String,
    /// Per-file results, ordered by path.
    pub files: Vec<FileAnalysis>,
    /// Sum of after-side cyclomatic complexity across files.
    pub total_cyclomatic: u64,
    /// Sum of after-side cognitive complexity across files.
    pub total_cognitive: u64,
    /// Sum of signed per-file cyclomatic deltas.
    pub complexity_delta: i64,
    /// Lines added plus removed across every changed file.
    pub churn: u64,
    /// Impact score in `[0, 100]`.
    pub impact_score: f64,
    /// Classification of the impact score.
    pub impact_level: ImpactLevel,
    /// Qualitative reasons behind the score.
    pub factors: Vec<String>,
    /// One fixed recommendation per triggered factor.
    pub recommendations: Vec<String>,
}

impl CommitAnalysis {
    /// An analysis of a commit touching no recognized files.
    pub fn empty(commit_id: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
            files: Vec::new(),
            total_cyclomatic: 0,
            total_cognitive: 0,
            complexity_delta: 0,
            churn: 0,
            impact_score: 0.0,
            impact_level: ImpactLevel::Low,
            factors: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Risk assessment for a change set (a base..head commit range).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetAnalysis {
    /// Resolved base reference.
    pub base_ref: String,
    /// Resolved head reference.
    pub head_ref: String,
    /// Per-commit breakdown over the range, oldest first.
    pub commits: Vec<CommitAnalysis>,
    /// Per-file results from the single base→head comparison.
    pub files: Vec<FileAnalysis>,
    /// Range-level after-side cyclomatic total.
    pub total_cyclomatic: u64,
    /// Range-level after-side cognitive total.
    pub total_cognitive: u64,
    /// Range-level signed cyclomatic delta.
    pub complexity_delta: i64,
    /// Lines added plus removed, summed across the range's commits.
    /// Measures work done, not resulting complexity.
    pub cumulative_churn: u64,
    /// Impact score in `[0, 100]`, from the range-level aggregate.
    pub impact_score: f64,
    /// Classification of the impact score.
    pub impact_level: ImpactLevel,
    /// Qualitative reasons behind the score.
    pub factors: Vec<String>,
    /// One fixed recommendation per triggered factor.
    pub recommendations: Vec<String>,
    /// Most volatile files over the range.
    pub hotspots: HotspotReport,
}

/// Impact score over aggregate numbers, clamped to `[0, 100]`.
///
/// `file_count * 10 + |complexity_delta| * 5 + total_cyclomatic * 2`.
///
/// # Examples
///
/// ```
/// use faultline_analysis::aggregate::impact_score;
///
/// assert_eq!(impact_score(0, 0, 0), 0.0);
/// assert_eq!(impact_score(2, 1, 5), 35.0);
/// assert_eq!(impact_score(50, 100, 100), 100.0);
/// ```
pub fn impact_score(file_count: usize, complexity_delta: i64, total_cyclomatic: u64) -> f64 {
    let raw = file_count as f64 * 10.0
        + complexity_delta.unsigned_abs() as f64 * 5.0
        + total_cyclomatic as f64 * 2.0;
    raw.clamp(0.0, 100.0)
}

/// Qualitative factors from fixed checks, in fixed order.
pub fn impact_factors(file_count: usize, total_cyclomatic: u64, total_cognitive: u64) -> Vec<String> {
    let mut factors = Vec::new();
    if file_count > 10 {
        factors.push("large change surface".to_string());
    }
    if total_cyclomatic > 50 {
        factors.push("significant complexity increase".to_string());
    }
    if total_cognitive > 75 {
        factors.push("high cognitive impact".to_string());
    }
    factors
}

/// The fixed recommendation paired with each factor.
pub fn recommendation_for(factor: &str) -> Option<&'static str> {
    match factor {
        "large change surface" => Some("Split the change into smaller, focused commits"),
        "significant complexity increase" => {
            Some("Add tests covering the most complex changed files")
        }
        "high cognitive impact" => Some("Request a second reviewer for deeply nested logic"),
        _ => None,
    }
}

/// Folds per-file analyses into commit and change-set assessments.
///
/// Owns its worker-pool semaphore; the accessor bounds subprocesses with
/// a separate one, so a waiting worker can never starve the git calls it
/// depends on.
pub struct Aggregator {
    git: Arc<GitAccessor>,
    engine: Arc<ChangeAnalyzer>,
    tracker: HotspotTracker,
    workers: Arc<Semaphore>,
    hotspot_defaults: ScanOptions,
}

impl Aggregator {
    /// Create an aggregator with a worker pool of `concurrency` tasks.
    pub fn new(
        git: Arc<GitAccessor>,
        engine: Arc<ChangeAnalyzer>,
        tracker: HotspotTracker,
        concurrency: usize,
        hotspot_defaults: ScanOptions,
    ) -> Self {
        Self {
            git,
            engine,
            tracker,
            workers: Arc::new(Semaphore::new(concurrency.max(1))),
            hotspot_defaults,
        }
    }

    /// Analyze the change introduced by one commit relative to its parent.
    ///
    /// # Errors
    ///
    /// Returns [`FaultlineError::Git`] when the reference does not resolve
    /// or the repository is unreachable. Per-file trouble degrades instead.
    pub async fn analyze_commit(&self, reference: &str) -> Result<CommitAnalysis, FaultlineError> {
        let records = self.git.diff_stats(reference).await?;
        let churn: u64 = records.iter().map(|r| r.insertions + r.deletions).sum();

        let before_ref = format!("{reference}^");
        let files = self
            .analyze_records(records, &before_ref, reference)
            .await;

        Ok(build_commit_analysis(reference, files, churn))
    }

    /// Analyze a change set: per-commit breakdown plus a single base→head
    /// aggregate and the hotspot ranking over the range.
    ///
    /// # Errors
    ///
    /// Returns [`FaultlineError::Git`] when the range cannot be resolved.
    pub async fn analyze_change_set(
        &self,
        identifier: &str,
        base: Option<&str>,
        head: Option<&str>,
    ) -> Result<ChangeSetAnalysis, FaultlineError> {
        let range = self
            .git
            .resolve_change_set_range(identifier, base, head)
            .await?;
        debug!(base = %range.base_ref, head = %range.head_ref, commits = range.commits.len(), "resolved change set");

        let mut commits = Vec::with_capacity(range.commits.len());
        for commit in &range.commits {
            commits.push(self.analyze_commit(commit).await?);
        }
        let cumulative_churn = commits.iter().map(|c| c.churn).sum();

        let records = self
            .git
            .range_diff_stats(&range.base_ref, &range.head_ref)
            .await?;
        let files = self
            .analyze_records(records, &range.base_ref, &range.head_ref)
            .await;

        let total_cyclomatic: u64 = files.iter().map(|f| u64::from(f.after.cyclomatic)).sum();
        let total_cognitive: u64 = files.iter().map(|f| u64::from(f.after.cognitive)).sum();
        let complexity_delta: i64 = files.iter().map(|f| f.delta).sum();

        let score = impact_score(files.len(), complexity_delta, total_cyclomatic);
        let factors = impact_factors(files.len(), total_cyclomatic, total_cognitive);
        let recommendations = factors
            .iter()
            .filter_map(|f| recommendation_for(f))
            .map(String::from)
            .collect();

        let hotspots = self
            .tracker
            .scan(&range.base_ref, &range.head_ref, &self.hotspot_defaults)
            .await?;

        Ok(ChangeSetAnalysis {
            base_ref: range.base_ref,
            head_ref: range.head_ref,
            commits,
            files,
            total_cyclomatic,
            total_cognitive,
            complexity_delta,
            cumulative_churn,
            impact_score: score,
            impact_level: ImpactLevel::from_score(score),
            factors,
            recommendations,
            hotspots,
        })
    }

    /// Run the engine over every qualifying record in parallel and merge
    /// the results by path key.
    async fn analyze_records(
        &self,
        records: Vec<FileChangeRecord>,
        before_ref: &str,
        after_ref: &str,
    ) -> Vec<FileAnalysis> {
        let mut handles = Vec::new();
        for record in records {
            if !self.engine.is_recognized(&record) {
                continue;
            }
            let engine = Arc::clone(&self.engine);
            let workers = Arc::clone(&self.workers);
            let before_ref = before_ref.to_string();
            let after_ref = after_ref.to_string();
            handles.push(tokio::spawn(async move {
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return FileAnalysis::degraded(&record, "worker pool closed"),
                };
                engine.analyze_file(&record, &before_ref, &after_ref).await
            }));
        }

        // Merge by path key; completion order carries no meaning.
        let mut by_path = BTreeMap::new();
        for handle in handles {
            match handle.await {
                Ok(analysis) => {
                    by_path.insert(analysis.path.clone(), analysis);
                }
                Err(err) => warn!(error = %err, "file analysis task failed"),
            }
        }
        by_path.into_values().collect()
    }
}

/// Fold per-file analyses into a commit assessment.
pub fn build_commit_analysis(
    commit_id: &str,
    files: Vec<FileAnalysis>,
    churn: u64,
) -> CommitAnalysis {
    let total_cyclomatic: u64 = files.iter().map(|f| u64::from(f.after.cyclomatic)).sum();
    let total_cognitive: u64 = files.iter().map(|f| u64::from(f.after.cognitive)).sum();
    let complexity_delta: i64 = files.iter().map(|f| f.delta).sum();

    let score = impact_score(files.len(), complexity_delta, total_cyclomatic);
    let factors = impact_factors(files.len(), total_cyclomatic, total_cognitive);
    let recommendations = factors
        .iter()
        .filter_map(|f| recommendation_for(f))
        .map(String::from)
        .collect();

    CommitAnalysis {
        commit_id: commit_id.to_string(),
        files,
        total_cyclomatic,
        total_cognitive,
        complexity_delta,
        churn,
        impact_score: score,
        impact_level: ImpactLevel::from_score(score),
        factors,
        recommendations,
    }
}

impl fmt::Display for CommitAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Commit {}", self.commit_id)?;
        writeln!(
            f,
            "Impact: {:.1}/100 ({})  cyclomatic={} cognitive={} delta={:+}",
            self.impact_score,
            self.impact_level,
            self.total_cyclomatic,
            self.total_cognitive,
            self.complexity_delta,
        )?;

        if !self.files.is_empty() {
            writeln!(f, "\n{:<40} {:>9} {:>7} {:>7}", "File", "Change", "Delta", "Risk")?;
            writeln!(f, "{}", "-".repeat(68))?;
            for file in &self.files {
                writeln!(
                    f,
                    "{:<40} {:>9} {:>+7} {:>7.1}",
                    file.path, file.change_type, file.delta, file.risk_score,
                )?;
            }
        }

        for (factor, rec) in self.factors.iter().zip(&self.recommendations) {
            writeln!(f, "\n! {factor}: {rec}")?;
        }
        Ok(())
    }
}

impl CommitAnalysis {
    /// Render the assessment as a markdown string.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Commit {}\n\n", self.commit_id));
        out.push_str(&format!(
            "**Impact:** {:.1}/100 ({}) — cyclomatic {} / cognitive {} / delta {:+}\n\n",
            self.impact_score,
            self.impact_level,
            self.total_cyclomatic,
            self.total_cognitive,
            self.complexity_delta,
        ));

        if !self.files.is_empty() {
            out.push_str("| File | Change | Delta | Risk |\n");
            out.push_str("|------|--------|-------|------|\n");
            for file in &self.files {
                out.push_str(&format!(
                    "| {} | {} | {:+} | {:.1} |\n",
                    file.path, file.change_type, file.delta, file.risk_score,
                ));
            }
            out.push('\n');
        }

        for (factor, rec) in self.factors.iter().zip(&self.recommendations) {
            out.push_str(&format!("- **{factor}**: {rec}\n"));
        }
        out
    }
}

impl fmt::Display for ChangeSetAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Change set {}..{}", self.base_ref, self.head_ref)?;
        writeln!(
            f,
            "Impact: {:.1}/100 ({})  {} commits, {} files, churn {}",
            self.impact_score,
            self.impact_level,
            self.commits.len(),
            self.files.len(),
            self.cumulative_churn,
        )?;
        writeln!(
            f,
            "Aggregate: cyclomatic={} cognitive={} delta={:+}",
            self.total_cyclomatic, self.total_cognitive, self.complexity_delta,
        )?;

        if !self.files.is_empty() {
            writeln!(f, "\n{:<40} {:>9} {:>7} {:>7}", "File", "Change", "Delta", "Risk")?;
            writeln!(f, "{}", "-".repeat(68))?;
            for file in &self.files {
                writeln!(
                    f,
                    "{:<40} {:>9} {:>+7} {:>7.1}",
                    file.path, file.change_type, file.delta, file.risk_score,
                )?;
            }
        }

        for (factor, rec) in self.factors.iter().zip(&self.recommendations) {
            writeln!(f, "\n! {factor}: {rec}")?;
        }

        if !self.hotspots.hotspots.is_empty() {
            writeln!(f, "\n{}", self.hotspots)?;
        }
        Ok(())
    }
}

impl ChangeSetAnalysis {
    /// Render the assessment as a markdown string.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Change Set `{}..{}`\n\n",
            self.base_ref, self.head_ref
        ));
        out.push_str(&format!(
            "**Impact:** {:.1}/100 ({}) — {} commits, {} files, churn {}\n\n",
            self.impact_score,
            self.impact_level,
            self.commits.len(),
            self.files.len(),
            self.cumulative_churn,
        ));

        if !self.files.is_empty() {
            out.push_str("| File | Change | Delta | Risk |\n");
            out.push_str("|------|--------|-------|------|\n");
            for file in &self.files {
                out.push_str(&format!(
                    "| {} | {} | {:+} | {:.1} |\n",
                    file.path, file.change_type, file.delta, file.risk_score,
                ));
            }
            out.push('\n');
        }

        for (factor, rec) in self.factors.iter().zip(&self.recommendations) {
            out.push_str(&format!("- **{factor}**: {rec}\n"));
        }

        if !self.hotspots.hotspots.is_empty() {
            out.push('\n');
            out.push_str(&self.hotspots.to_markdown());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::{ChangeType, ComplexityMetrics};

    fn analysis(path: &str, cyclomatic: u32, cognitive: u32, delta: i64) -> FileAnalysis {
        let after = ComplexityMetrics {
            cyclomatic,
            cognitive,
            token_stats: None,
            maintainability: None,
        };
        let score = crate::engine::risk_score(&after);
        FileAnalysis {
            path: path.into(),
            change_type: ChangeType::Modified,
            before: ComplexityMetrics::absent(),
            after,
            delta,
            risk_score: score,
            impact_level: ImpactLevel::from_score(score),
            suggestions: Vec::new(),
            degraded: None,
        }
    }

    #[test]
    fn impact_score_is_clamped() {
        assert_eq!(impact_score(0, 0, 0), 0.0);
        assert_eq!(impact_score(1000, i64::MAX, u64::MAX), 100.0);
        assert_eq!(impact_score(2, -1, 5), 35.0);
    }

    #[test]
    fn empty_commit_scores_zero_with_no_recommendations() {
        let result = build_commit_analysis("abc", Vec::new(), 0);
        assert_eq!(result.impact_score, 0.0);
        assert_eq!(result.impact_level, ImpactLevel::Low);
        assert!(result.factors.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn totals_sum_after_side_metrics() {
        let files = vec![analysis("a.ts", 3, 4, 1), analysis("b.ts", 5, 6, -2)];
        let result = build_commit_analysis("abc", files, 12);
        assert_eq!(result.total_cyclomatic, 8);
        assert_eq!(result.total_cognitive, 10);
        assert_eq!(result.complexity_delta, -1);
        assert_eq!(result.churn, 12);
    }

    #[test]
    fn large_commits_trigger_both_factors() {
        // 12 files, total cyclomatic 60: both the surface and the
        // complexity factor must fire.
        let files: Vec<FileAnalysis> = (0..12)
            .map(|i| analysis(&format!("src/f{i}.ts"), 5, 1, 1))
            .collect();
        let result = build_commit_analysis("abc", files, 0);
        assert!(result.factors.iter().any(|f| f == "large change surface"));
        assert!(result
            .factors
            .iter()
            .any(|f| f == "significant complexity increase"));
        assert_eq!(result.factors.len(), result.recommendations.len());
    }

    #[test]
    fn factor_thresholds_are_exclusive() {
        let factors = impact_factors(10, 50, 75);
        assert!(factors.is_empty());
        let factors = impact_factors(11, 51, 76);
        assert_eq!(factors.len(), 3);
    }

    #[test]
    fn every_factor_has_a_recommendation() {
        for factor in impact_factors(100, 100, 100) {
            assert!(recommendation_for(&factor).is_some(), "missing rec for {factor}");
        }
    }

    #[test]
    fn renderers_mention_the_commit() {
        let result = build_commit_analysis("abc123", vec![analysis("a.ts", 2, 0, 1)], 3);
        let text = format!("{result}");
        assert!(text.contains("abc123"));
        assert!(text.contains("a.ts"));
        let md = result.to_markdown();
        assert!(md.contains("# Commit abc123"));
        assert!(md.contains("| a.ts |"));
    }

    #[test]
    fn commit_analysis_serializes_camel_case() {
        let result = build_commit_analysis("abc", Vec::new(), 0);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("totalCyclomatic").is_some());
        assert!(json.get("impactLevel").is_some());
        assert!(json.get("total_cyclomatic").is_none());
    }
}
