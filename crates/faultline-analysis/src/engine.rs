//! Per-file change analysis: before/after metrics, delta, risk, suggestions.

use std::collections::HashSet;
use std::sync::Arc;

use faultline_core::{
    AnalysisConfig, ChangeType, ComplexityMetrics, FileChangeRecord, ImpactLevel,
};
use faultline_git::GitAccessor;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Source extensions analyzed by default.
const RECOGNIZED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "rs", "py", "go", "java", "c", "h", "cpp", "hpp",
    "cc", "cs", "rb", "php", "swift", "kt",
];

/// Complexity comparison for one changed file.
///
/// `before` and `after` are always present; a file absent at one end of
/// the comparison carries zero-valued metrics so the delta stays
/// arithmetically well-defined. `degraded` is set when a per-file failure
/// was absorbed instead of aborting the batch.
///
/// # Examples
///
/// ```
/// use faultline_core::{ChangeType, ComplexityMetrics, FileChangeRecord};
/// use faultline_analysis::engine::FileAnalysis;
///
/// let record = FileChangeRecord {
///     path: "src/a.ts".into(),
///     change_type: ChangeType::Modified,
///     insertions: 1,
///     deletions: 0,
///     is_binary: false,
///     renamed_from: None,
/// };
/// let degraded = FileAnalysis::degraded(&record, "content not readable");
/// assert_eq!(degraded.after, ComplexityMetrics::absent());
/// assert!(degraded.degraded.is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    /// Path relative to the repository root.
    pub path: String,
    /// How the file changed.
    pub change_type: ChangeType,
    /// Metrics at the old side of the comparison.
    pub before: ComplexityMetrics,
    /// Metrics at the new side of the comparison.
    pub after: ComplexityMetrics,
    /// `after.cyclomatic - before.cyclomatic`, signed.
    pub delta: i64,
    /// Risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Classification of the risk score.
    pub impact_level: ImpactLevel,
    /// Deterministic remediation suggestions, fixed order.
    pub suggestions: Vec<String>,
    /// Reason the file was degraded to zero metrics, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl FileAnalysis {
    /// A zero-metric analysis recording a per-file failure.
    ///
    /// The reason lands both in `degraded` and in a suggestion string, so
    /// it survives serialization paths that only render suggestions.
    pub fn degraded(record: &FileChangeRecord, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            path: record.path.clone(),
            change_type: record.change_type,
            before: ComplexityMetrics::absent(),
            after: ComplexityMetrics::absent(),
            delta: 0,
            risk_score: 0.0,
            impact_level: ImpactLevel::Low,
            suggestions: vec![format!("analysis skipped: {reason}")],
            degraded: Some(reason),
        }
    }
}

/// Risk score for one file from its after-side metrics.
///
/// `((cyclomatic / 10) + (cognitive / 15)) * 50`, clamped to `[0, 100]`.
///
/// # Examples
///
/// ```
/// use faultline_core::ComplexityMetrics;
/// use faultline_analysis::engine::risk_score;
///
/// let metrics = ComplexityMetrics { cyclomatic: 2, cognitive: 0, token_stats: None, maintainability: None };
/// assert_eq!(risk_score(&metrics), 10.0);
/// ```
pub fn risk_score(after: &ComplexityMetrics) -> f64 {
    ((f64::from(after.cyclomatic) / 10.0 + f64::from(after.cognitive) / 15.0) * 50.0)
        .clamp(0.0, 100.0)
}

/// Remediation suggestions from a fixed rule set, appended in fixed order.
pub fn suggestions_for(after: &ComplexityMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if after.cyclomatic > 10 {
        out.push(
            "High cyclomatic complexity: reduce branching by extracting decision logic into smaller functions"
                .to_string(),
        );
    }
    if after.cognitive > 15 {
        out.push(
            "High cognitive complexity: simplify nested control structures or flatten early returns"
                .to_string(),
        );
    }
    if let Some(mi) = after.maintainability {
        if mi < 50.0 {
            out.push("Low maintainability: refactor this file before extending it".to_string());
        }
    }
    out
}

/// Analyzes one changed file by comparing its two sides.
///
/// Holds the recognized-extension set and the file size cap; retrieval
/// goes through the injected accessor.
pub struct ChangeAnalyzer {
    git: Arc<GitAccessor>,
    extensions: HashSet<String>,
    max_file_bytes: usize,
}

impl ChangeAnalyzer {
    /// Create an analyzer over `git` using `config`'s extension and size
    /// settings.
    pub fn new(git: Arc<GitAccessor>, config: &AnalysisConfig) -> Self {
        let mut extensions: HashSet<String> =
            RECOGNIZED_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for ext in &config.extra_extensions {
            extensions.insert(ext.trim_start_matches('.').to_lowercase());
        }
        Self {
            git,
            extensions,
            max_file_bytes: config.max_file_bytes,
        }
    }

    /// Whether a record qualifies for complexity analysis.
    ///
    /// Binary files never qualify; others qualify by extension.
    pub fn is_recognized(&self, record: &FileChangeRecord) -> bool {
        if record.is_binary {
            return false;
        }
        std::path::Path::new(&record.path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }

    /// Analyze one changed file between `before_ref` and `after_ref`.
    ///
    /// Never fails: retrieval or analysis trouble produces a degraded
    /// zero-metric result and the batch continues.
    pub async fn analyze_file(
        &self,
        record: &FileChangeRecord,
        before_ref: &str,
        after_ref: &str,
    ) -> FileAnalysis {
        let before_path = record.renamed_from.as_deref().unwrap_or(&record.path);

        let before_text = match record.change_type {
            ChangeType::Added => Ok(String::new()),
            _ => self.git.content_at(before_ref, before_path).await,
        };
        let after_text = match record.change_type {
            ChangeType::Deleted => Ok(String::new()),
            _ => self.git.content_at(after_ref, &record.path).await,
        };

        let (before_text, after_text) = match (before_text, after_text) {
            (Ok(b), Ok(a)) => (b, a),
            (Err(err), _) | (_, Err(err)) => {
                warn!(path = %record.path, error = %err, "degrading file analysis");
                return FileAnalysis::degraded(record, err.to_string());
            }
        };

        if before_text.len() > self.max_file_bytes || after_text.len() > self.max_file_bytes {
            return FileAnalysis::degraded(
                record,
                format!("file exceeds analysis size limit of {} bytes", self.max_file_bytes),
            );
        }

        let before = metrics_for(&before_text);
        let after = metrics_for(&after_text);
        let delta = i64::from(after.cyclomatic) - i64::from(before.cyclomatic);
        let score = risk_score(&after);
        let suggestions = suggestions_for(&after);

        FileAnalysis {
            path: record.path.clone(),
            change_type: record.change_type,
            before,
            after,
            delta,
            risk_score: score,
            impact_level: ImpactLevel::from_score(score),
            suggestions,
            degraded: None,
        }
    }
}

/// Metrics for one side of a comparison. Absent content (empty text) maps
/// to zero-valued metrics so new and deleted files stay comparable.
pub(crate) fn metrics_for(text: &str) -> ComplexityMetrics {
    if text.is_empty() {
        ComplexityMetrics::absent()
    } else {
        faultline_metrics::analyze(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cyclomatic: u32, cognitive: u32) -> ComplexityMetrics {
        ComplexityMetrics {
            cyclomatic,
            cognitive,
            token_stats: None,
            maintainability: None,
        }
    }

    fn record(path: &str, change_type: ChangeType) -> FileChangeRecord {
        FileChangeRecord {
            path: path.into(),
            change_type,
            insertions: 1,
            deletions: 0,
            is_binary: false,
            renamed_from: None,
        }
    }

    #[test]
    fn risk_score_matches_formula() {
        assert_eq!(risk_score(&metrics(2, 0)), 10.0);
        assert_eq!(risk_score(&metrics(10, 0)), 50.0);
        assert_eq!(risk_score(&metrics(0, 15)), 50.0);
        assert_eq!(risk_score(&metrics(0, 0)), 0.0);
    }

    #[test]
    fn risk_score_clamps_for_huge_inputs() {
        assert_eq!(risk_score(&metrics(u32::MAX, u32::MAX)), 100.0);
        assert_eq!(risk_score(&metrics(50, 0)), 100.0);
    }

    #[test]
    fn low_complexity_yields_no_suggestions() {
        assert!(suggestions_for(&metrics(2, 1)).is_empty());
    }

    #[test]
    fn suggestions_trigger_in_fixed_order() {
        let mut m = metrics(11, 16);
        m.maintainability = Some(40.0);
        let suggestions = suggestions_for(&m);
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions[0].contains("cyclomatic"));
        assert!(suggestions[1].contains("cognitive"));
        assert!(suggestions[2].contains("maintainability"));
    }

    #[test]
    fn suggestion_thresholds_are_exclusive() {
        // Exactly at the threshold triggers nothing.
        let mut m = metrics(10, 15);
        m.maintainability = Some(50.0);
        assert!(suggestions_for(&m).is_empty());
    }

    #[test]
    fn degraded_analysis_is_zero_metric_and_inspectable() {
        let analysis = FileAnalysis::degraded(&record("a.ts", ChangeType::Modified), "boom");
        assert_eq!(analysis.before.cyclomatic, 0);
        assert_eq!(analysis.after.cyclomatic, 0);
        assert_eq!(analysis.risk_score, 0.0);
        assert_eq!(analysis.degraded.as_deref(), Some("boom"));
        assert!(analysis.suggestions[0].contains("boom"));
    }

    #[test]
    fn empty_text_maps_to_absent_metrics() {
        assert_eq!(metrics_for(""), ComplexityMetrics::absent());
        assert_eq!(metrics_for("x = 1"), faultline_metrics::analyze("x = 1"));
    }

    #[tokio::test]
    async fn recognition_gates_binary_and_extension() {
        let git = Arc::new(GitAccessor::new(
            ".",
            Arc::new(tokio::sync::Semaphore::new(1)),
            &[],
        ));
        let analyzer = ChangeAnalyzer::new(git, &AnalysisConfig::default());

        assert!(analyzer.is_recognized(&record("src/main.rs", ChangeType::Modified)));
        assert!(analyzer.is_recognized(&record("web/App.TSX", ChangeType::Added)));
        assert!(!analyzer.is_recognized(&record("README.md", ChangeType::Modified)));
        assert!(!analyzer.is_recognized(&record("noextension", ChangeType::Modified)));

        let mut binary = record("blob.ts", ChangeType::Modified);
        binary.is_binary = true;
        assert!(!analyzer.is_recognized(&binary));
    }

    #[tokio::test]
    async fn extra_extensions_extend_recognition() {
        let git = Arc::new(GitAccessor::new(
            ".",
            Arc::new(tokio::sync::Semaphore::new(1)),
            &[],
        ));
        let config = AnalysisConfig {
            extra_extensions: vec![".vue".into()],
            ..AnalysisConfig::default()
        };
        let analyzer = ChangeAnalyzer::new(git, &config);
        assert!(analyzer.is_recognized(&record("web/App.vue", ChangeType::Added)));
    }
}
