use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Structural complexity of one version of one file.
///
/// Computed from raw text by `faultline-metrics` and never mutated after
/// creation. A file that does not exist at one end of a comparison is
/// represented by [`ComplexityMetrics::absent`], never by a missing value,
/// so deltas stay arithmetically well-defined.
///
/// # Examples
///
/// ```
/// use faultline_core::ComplexityMetrics;
///
/// let absent = ComplexityMetrics::absent();
/// assert_eq!(absent.cyclomatic, 0);
/// assert_eq!(absent.cognitive, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityMetrics {
    /// Decision-point count, baseline 1 for any analyzed text.
    pub cyclomatic: u32,
    /// Nesting-weighted readability cost.
    pub cognitive: u32,
    /// Operator/operand statistics, when token analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_stats: Option<TokenStats>,
    /// Composite upkeep score in `[0, 100]`, when computable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainability: Option<f64>,
}

impl ComplexityMetrics {
    /// The zero-valued metrics standing in for a file absent at a ref.
    pub fn absent() -> Self {
        Self {
            cyclomatic: 0,
            cognitive: 0,
            token_stats: None,
            maintainability: None,
        }
    }
}

/// Operator/operand token statistics with the derived composite measures.
///
/// `vocabulary` and `length` are the unique and total token counts;
/// `volume = length * log2(vocabulary)`,
/// `difficulty = (unique_operators / 2) * (total_operands / unique_operands)`,
/// `effort = difficulty * volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    /// Total operator occurrences.
    pub total_operators: u32,
    /// Distinct operators seen.
    pub unique_operators: u32,
    /// Total operand occurrences.
    pub total_operands: u32,
    /// Distinct operands seen.
    pub unique_operands: u32,
    /// `unique_operators + unique_operands`.
    pub vocabulary: u32,
    /// `total_operators + total_operands`.
    pub length: u32,
    /// Program volume.
    pub volume: f64,
    /// Estimated difficulty.
    pub difficulty: f64,
    /// `difficulty * volume`.
    pub effort: f64,
}

/// How a file changed within a commit or range.
///
/// # Examples
///
/// ```
/// use faultline_core::ChangeType;
///
/// assert_eq!(ChangeType::Deleted.to_string(), "deleted");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// File introduced by this change.
    Added,
    /// File edited in place.
    Modified,
    /// File removed by this change.
    Deleted,
    /// File moved from another path.
    Renamed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Deleted => write!(f, "deleted"),
            ChangeType::Renamed => write!(f, "renamed"),
        }
    }
}

/// One changed file as reported by the accessor's diff statistics.
///
/// Binary files carry zero insertion/deletion counts and are excluded
/// from complexity analysis downstream.
///
/// # Examples
///
/// ```
/// use faultline_core::{ChangeType, FileChangeRecord};
///
/// let record = FileChangeRecord {
///     path: "src/auth.ts".into(),
///     change_type: ChangeType::Modified,
///     insertions: 12,
///     deletions: 3,
///     is_binary: false,
///     renamed_from: None,
/// };
/// assert!(!record.is_binary);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeRecord {
    /// Path relative to the repository root (new path for renames).
    pub path: String,
    /// Classification of the change.
    pub change_type: ChangeType,
    /// Lines added.
    pub insertions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// True when git reported the file as binary.
    pub is_binary: bool,
    /// Previous path, for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
}

/// Categorical impact classification over a `[0, 100]` score.
///
/// The mapping is total and boundary-exact: score > 70 is high,
/// score > 40 is medium, everything else is low.
///
/// # Examples
///
/// ```
/// use faultline_core::ImpactLevel;
///
/// assert_eq!(ImpactLevel::from_score(70.0), ImpactLevel::Medium);
/// assert_eq!(ImpactLevel::from_score(70.1), ImpactLevel::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    /// Score in `[0, 40]`.
    Low,
    /// Score in `(40, 70]`.
    Medium,
    /// Score in `(70, 100]`.
    High,
}

impl ImpactLevel {
    /// Map a numeric score to an impact level.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline_core::ImpactLevel;
    ///
    /// assert_eq!(ImpactLevel::from_score(0.0), ImpactLevel::Low);
    /// assert_eq!(ImpactLevel::from_score(40.0), ImpactLevel::Low);
    /// assert_eq!(ImpactLevel::from_score(40.1), ImpactLevel::Medium);
    /// assert_eq!(ImpactLevel::from_score(100.0), ImpactLevel::High);
    /// ```
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            ImpactLevel::High
        } else if score > 40.0 {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }

    /// Returns `true` if `self` is at least as severe as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline_core::ImpactLevel;
    ///
    /// assert!(ImpactLevel::High.meets_threshold(ImpactLevel::Medium));
    /// assert!(!ImpactLevel::Low.meets_threshold(ImpactLevel::Medium));
    /// ```
    pub fn meets_threshold(self, threshold: ImpactLevel) -> bool {
        self.rank() >= threshold.rank()
    }

    fn rank(self) -> u8 {
        match self {
            ImpactLevel::Low => 0,
            ImpactLevel::Medium => 1,
            ImpactLevel::High => 2,
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
        }
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ImpactLevel::Low),
            "medium" => Ok(ImpactLevel::Medium),
            "high" => Ok(ImpactLevel::High),
            other => Err(format!("unknown impact level: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use faultline_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_metrics_are_zero_valued() {
        let absent = ComplexityMetrics::absent();
        assert_eq!(absent.cyclomatic, 0);
        assert_eq!(absent.cognitive, 0);
        assert!(absent.token_stats.is_none());
        assert!(absent.maintainability.is_none());
    }

    #[test]
    fn impact_level_boundaries_are_exact() {
        assert_eq!(ImpactLevel::from_score(0.0), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(40.0), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(40.000001), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(70.0), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(70.000001), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(100.0), ImpactLevel::High);
    }

    #[test]
    fn impact_level_is_total_over_a_score_sweep() {
        // Every representable score maps to exactly one level.
        let mut score = 0.0f64;
        while score <= 100.0 {
            let level = ImpactLevel::from_score(score);
            let count = [ImpactLevel::Low, ImpactLevel::Medium, ImpactLevel::High]
                .iter()
                .filter(|l| **l == level)
                .count();
            assert_eq!(count, 1);
            score += 0.25;
        }
    }

    #[test]
    fn impact_level_threshold_ordering() {
        assert!(ImpactLevel::High.meets_threshold(ImpactLevel::Low));
        assert!(ImpactLevel::High.meets_threshold(ImpactLevel::High));
        assert!(ImpactLevel::Medium.meets_threshold(ImpactLevel::Low));
        assert!(!ImpactLevel::Medium.meets_threshold(ImpactLevel::High));
        assert!(!ImpactLevel::Low.meets_threshold(ImpactLevel::Medium));
    }

    #[test]
    fn impact_level_from_str() {
        assert_eq!("low".parse::<ImpactLevel>().unwrap(), ImpactLevel::Low);
        assert_eq!("HIGH".parse::<ImpactLevel>().unwrap(), ImpactLevel::High);
        assert!("critical".parse::<ImpactLevel>().is_err());
    }

    #[test]
    fn change_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChangeType::Renamed).unwrap();
        assert_eq!(json, "\"renamed\"");
    }

    #[test]
    fn file_change_record_serializes_camel_case() {
        let record = FileChangeRecord {
            path: "src/a.rs".into(),
            change_type: ChangeType::Added,
            insertions: 1,
            deletions: 0,
            is_binary: false,
            renamed_from: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("changeType").is_some());
        assert!(json.get("isBinary").is_some());
        assert!(json.get("renamedFrom").is_none());
    }

    #[test]
    fn metrics_omit_optional_fields_when_absent() {
        let json = serde_json::to_value(ComplexityMetrics::absent()).unwrap();
        assert!(json.get("tokenStats").is_none());
        assert!(json.get("maintainability").is_none());
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
