//! Lexical cyclomatic and cognitive complexity counts.
//!
//! Matching is word-boundary token matching over raw text, not parsing.
//! Decision tokens inside strings or comments are counted; that is the
//! accepted trade for language-agnostic behavior.

/// Decision-point keywords counted toward cyclomatic complexity.
const DECISION_KEYWORDS: &[&str] = &["if", "else", "while", "for", "case", "catch"];

/// Control keywords that trigger a nesting-weighted cognitive increment.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "foreach", "catch"];

/// Count linearly independent paths, approximated lexically.
///
/// Starts at 1 and adds 1 for every decision keyword, every `&&`/`||`,
/// and every ternary `?`.
///
/// # Examples
///
/// ```
/// use faultline_metrics::complexity::cyclomatic;
///
/// assert_eq!(cyclomatic(""), 1);
/// assert_eq!(cyclomatic("if (x) { y(); }"), 2);
/// assert_eq!(cyclomatic("a && b || c"), 3);
/// ```
pub fn cyclomatic(text: &str) -> u32 {
    let mut count = 1u32;
    for word in identifier_tokens(text) {
        if DECISION_KEYWORDS.contains(&word) {
            count += 1;
        }
    }
    count += text.matches("&&").count() as u32;
    count += text.matches("||").count() as u32;
    count += text.chars().filter(|c| *c == '?').count() as u32;
    count
}

/// Nesting-weighted readability cost.
///
/// Scans line by line, tracking brace depth (floored at zero). A line
/// containing a control keyword costs `1 + depth`; every logical operator
/// occurrence costs 1.
///
/// # Examples
///
/// ```
/// use faultline_metrics::complexity::cognitive;
///
/// assert_eq!(cognitive(""), 0);
/// let nested = "if (a) {\n    if (b) {\n        work();\n    }\n}\n";
/// assert_eq!(cognitive(nested), 3); // outer 1, inner 1 + depth 1
/// ```
pub fn cognitive(text: &str) -> u32 {
    let mut score = 0u32;
    let mut depth = 0u32;

    for line in text.lines() {
        if identifier_tokens(line).any(|w| CONTROL_KEYWORDS.contains(&w)) {
            score += 1 + depth;
        }
        score += line.matches("&&").count() as u32;
        score += line.matches("||").count() as u32;

        let opens = line.matches('{').count() as u32;
        let closes = line.matches('}').count() as u32;
        depth = (depth + opens).saturating_sub(closes);
    }

    score
}

/// Count non-blank lines, the size term used by the maintainability score.
pub fn lines_of_code(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

fn identifier_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
}
