//! Complexity-trend hotspot detection over a commit range.
//!
//! For every file touched in the range, builds a time-ordered trend of
//! complexity metrics and a change-frequency count, then ranks the most
//! volatile files. Ranking is deterministic: frequency descending, path
//! ascending on ties.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use faultline_core::{ComplexityMetrics, FaultlineError};
use faultline_git::GitAccessor;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{metrics_for, ChangeAnalyzer};

/// One point of a file's complexity trend, in commit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Commit that touched the file.
    pub commit_id: String,
    /// Metrics of the file as of that commit.
    pub metrics: ComplexityMetrics,
}

/// Direction of a complexity trend, classified from its slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Slope above the dead zone.
    Rising,
    /// Slope below the dead zone.
    Falling,
    /// Slope within ±0.05.
    Flat,
}

/// A file ranked by how often and how riskily it changes.
///
/// # Examples
///
/// ```
/// use faultline_analysis::hotspots::{Hotspot, TrendDirection};
///
/// let spot = Hotspot {
///     path: "src/auth.ts".into(),
///     change_frequency: 7,
///     complexity_trend: vec![],
///     trend_slope: 1.5,
///     direction: TrendDirection::Rising,
/// };
/// assert_eq!(spot.change_frequency, 7);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// File path relative to the repository root.
    pub path: String,
    /// Number of commits in the range touching this file.
    pub change_frequency: u32,
    /// Ordered complexity measurements, oldest commit first.
    pub complexity_trend: Vec<TrendPoint>,
    /// Least-squares slope of the cyclomatic series.
    pub trend_slope: f64,
    /// Classification of the slope.
    pub direction: TrendDirection,
}

/// Result of a hotspot scan.
///
/// `complete` is `false` when the scan deadline elapsed and the ranking
/// covers only the commits scanned so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReport {
    /// Ranked hotspots, capped at the requested top-N.
    pub hotspots: Vec<Hotspot>,
    /// Commits actually scanned.
    pub commits_scanned: usize,
    /// Whether the whole range was covered before the deadline.
    pub complete: bool,
}

/// Bounds for one hotspot scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Restrict the scan to these paths (empty scans everything).
    pub paths: Vec<String>,
    /// Cap on commits scanned; the most recent commits win.
    pub max_commits: usize,
    /// Cap on returned hotspots.
    pub top_n: usize,
    /// Deadline after which partial results are returned.
    pub timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            max_commits: 200,
            top_n: 10,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Walks a commit range and ranks files by volatility.
pub struct HotspotTracker {
    git: Arc<GitAccessor>,
    engine: Arc<ChangeAnalyzer>,
}

impl HotspotTracker {
    /// Create a tracker over `git`, reusing the engine's recognition gate.
    pub fn new(git: Arc<GitAccessor>, engine: Arc<ChangeAnalyzer>) -> Self {
        Self { git, engine }
    }

    /// Scan `base..head` and rank the most volatile files.
    ///
    /// The scan visits each commit's changed files, measuring the file's
    /// complexity as of that commit. When the deadline passes between
    /// commits, the partial ranking is returned with `complete: false`
    /// rather than blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`FaultlineError::Git`] when the range does not resolve.
    /// Per-file retrieval trouble is skipped, not fatal.
    pub async fn scan(
        &self,
        base: &str,
        head: &str,
        options: &ScanOptions,
    ) -> Result<HotspotReport, FaultlineError> {
        let mut commits = self.git.commits_between(base, head).await?;
        if commits.len() > options.max_commits {
            // Keep the most recent commits; rev-list output is oldest first.
            commits = commits.split_off(commits.len() - options.max_commits);
        }

        let deadline = options.timeout.map(|t| Instant::now() + t);
        let mut trends: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();
        let mut commits_scanned = 0usize;
        let mut complete = true;

        for commit in &commits {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    debug!(commits_scanned, "hotspot scan deadline reached");
                    complete = false;
                    break;
                }
            }

            let records = self.git.diff_stats(commit).await?;
            for record in records {
                if !self.engine.is_recognized(&record) {
                    continue;
                }
                if !options.paths.is_empty() && !options.paths.iter().any(|p| *p == record.path) {
                    continue;
                }

                let text = match self.git.content_at(commit, &record.path).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(path = %record.path, error = %err, "skipping trend point");
                        continue;
                    }
                };
                trends.entry(record.path).or_default().push(TrendPoint {
                    commit_id: commit.clone(),
                    metrics: metrics_for(&text),
                });
            }
            commits_scanned += 1;
        }

        let mut report = rank_trends(trends, options.top_n);
        report.commits_scanned = commits_scanned;
        report.complete = complete;
        Ok(report)
    }
}

/// Build the ranked report from accumulated trends.
fn rank_trends(trends: BTreeMap<String, Vec<TrendPoint>>, top_n: usize) -> HotspotReport {
    let mut hotspots: Vec<Hotspot> = trends
        .into_iter()
        .map(|(path, trend)| {
            let series: Vec<f64> = trend
                .iter()
                .map(|p| f64::from(p.metrics.cyclomatic))
                .collect();
            let slope = least_squares_slope(&series);
            Hotspot {
                path,
                change_frequency: trend.len() as u32,
                complexity_trend: trend,
                trend_slope: slope,
                direction: TrendDirection::from_slope(slope),
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.change_frequency
            .cmp(&a.change_frequency)
            .then_with(|| a.path.cmp(&b.path))
    });
    hotspots.truncate(top_n);

    HotspotReport {
        hotspots,
        commits_scanned: 0,
        complete: true,
    }
}

impl TrendDirection {
    /// Classify a slope with a ±0.05 dead zone.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.05 {
            TrendDirection::Rising
        } else if slope < -0.05 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        }
    }
}

/// Least-squares slope of `values` over their indices.
///
/// Series shorter than two points have no trend and yield 0.
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denominator
}

impl fmt::Display for HotspotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Hotspots ({} commits scanned{})",
            self.commits_scanned,
            if self.complete { "" } else { ", partial" },
        )?;
        writeln!(f, "{:<40} {:>7} {:>8} {:>8}", "File", "Changes", "Slope", "Trend")?;
        writeln!(f, "{}", "-".repeat(68))?;
        for spot in &self.hotspots {
            writeln!(
                f,
                "{:<40} {:>7} {:>8.2} {:>8}",
                spot.path,
                spot.change_frequency,
                spot.trend_slope,
                match spot.direction {
                    TrendDirection::Rising => "rising",
                    TrendDirection::Falling => "falling",
                    TrendDirection::Flat => "flat",
                },
            )?;
        }
        Ok(())
    }
}

impl HotspotReport {
    /// Render the report as a markdown string.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("## Hotspots\n\n");
        if !self.complete {
            out.push_str("_Partial results: the scan deadline elapsed._\n\n");
        }
        out.push_str("| File | Changes | Slope | Trend |\n");
        out.push_str("|------|---------|-------|-------|\n");
        for spot in &self.hotspots {
            out.push_str(&format!(
                "| {} | {} | {:.2} | {:?} |\n",
                spot.path, spot.change_frequency, spot.trend_slope, spot.direction,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(commit: &str, cyclomatic: u32) -> TrendPoint {
        TrendPoint {
            commit_id: commit.into(),
            metrics: ComplexityMetrics {
                cyclomatic,
                cognitive: 0,
                token_stats: None,
                maintainability: None,
            },
        }
    }

    fn trends(entries: &[(&str, &[u32])]) -> BTreeMap<String, Vec<TrendPoint>> {
        entries
            .iter()
            .map(|(path, values)| {
                let trend = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| point(&format!("c{i}"), *v))
                    .collect();
                (path.to_string(), trend)
            })
            .collect()
    }

    #[test]
    fn slope_of_rising_series_is_positive() {
        let slope = least_squares_slope(&[1.0, 2.0, 3.0, 4.0]);
        assert!((slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn slope_of_flat_series_is_zero() {
        assert_eq!(least_squares_slope(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(least_squares_slope(&[7.0]), 0.0);
        assert_eq!(least_squares_slope(&[]), 0.0);
    }

    #[test]
    fn direction_dead_zone() {
        assert_eq!(TrendDirection::from_slope(0.0), TrendDirection::Flat);
        assert_eq!(TrendDirection::from_slope(0.05), TrendDirection::Flat);
        assert_eq!(TrendDirection::from_slope(0.051), TrendDirection::Rising);
        assert_eq!(TrendDirection::from_slope(-0.051), TrendDirection::Falling);
    }

    #[test]
    fn ranking_is_frequency_desc_then_path_asc() {
        let report = rank_trends(
            trends(&[
                ("b.ts", &[1, 2]),
                ("a.ts", &[1, 2]),
                ("busy.ts", &[1, 2, 3]),
            ]),
            10,
        );
        let paths: Vec<&str> = report.hotspots.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["busy.ts", "a.ts", "b.ts"]);
    }

    #[test]
    fn ranking_never_exceeds_top_n() {
        let report = rank_trends(
            trends(&[("a.ts", &[1]), ("b.ts", &[1]), ("c.ts", &[1])]),
            2,
        );
        assert_eq!(report.hotspots.len(), 2);
    }

    #[test]
    fn change_frequency_counts_trend_entries() {
        let report = rank_trends(trends(&[("a.ts", &[1, 3, 5])]), 10);
        let spot = &report.hotspots[0];
        assert_eq!(spot.change_frequency, 3);
        assert_eq!(spot.complexity_trend.len(), 3);
        assert_eq!(spot.direction, TrendDirection::Rising);
        assert!((spot.trend_slope - 2.0).abs() < 1e-9);
    }

    #[test]
    fn falling_trend_is_classified() {
        let report = rank_trends(trends(&[("a.ts", &[9, 5, 1])]), 10);
        assert_eq!(report.hotspots[0].direction, TrendDirection::Falling);
    }

    #[test]
    fn renderers_flag_partial_results() {
        let mut report = rank_trends(trends(&[("a.ts", &[1, 2])]), 10);
        report.complete = false;
        report.commits_scanned = 1;
        assert!(format!("{report}").contains("partial"));
        assert!(report.to_markdown().contains("Partial results"));
    }
}
