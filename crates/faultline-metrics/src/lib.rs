//! Pure structural-complexity analysis over raw source text.
//!
//! [`analyze`] is a side-effect-free function from text to
//! [`ComplexityMetrics`]: lexical cyclomatic count, nesting-weighted
//! cognitive count, operator/operand token statistics, and a composite
//! maintainability score. No I/O, no global state, safe to call from any
//! number of tasks at once.
//!
//! The analysis is deliberately lexical, not syntactic: decision tokens are
//! matched on word boundaries wherever they occur, including inside string
//! literals and comments. That trades precision for identical behavior
//! across every language the pipeline meets.

pub mod complexity;
pub mod tokens;

use faultline_core::ComplexityMetrics;

/// Analyze `text` and produce its complexity metrics.
///
/// Empty text yields the baseline: cyclomatic 1, cognitive 0, no token
/// statistics, no maintainability score.
///
/// # Examples
///
/// ```
/// use faultline_metrics::analyze;
///
/// let empty = analyze("");
/// assert_eq!(empty.cyclomatic, 1);
/// assert_eq!(empty.cognitive, 0);
///
/// let branchy = analyze("if (a && b) { run(); }");
/// assert_eq!(branchy.cyclomatic, 3);
/// assert!(branchy.token_stats.is_some());
/// ```
pub fn analyze(text: &str) -> ComplexityMetrics {
    let cyclomatic = complexity::cyclomatic(text);
    let cognitive = complexity::cognitive(text);
    let token_stats = tokens::token_stats(text);
    let maintainability = token_stats
        .as_ref()
        .and_then(|t| tokens::maintainability(t.volume, cyclomatic, complexity::lines_of_code(text)));

    ComplexityMetrics {
        cyclomatic,
        cognitive,
        token_stats,
        maintainability,
    }
}
