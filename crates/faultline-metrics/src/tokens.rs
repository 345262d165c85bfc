//! Operator/operand token statistics and the maintainability score.

use std::collections::HashSet;

use faultline_core::TokenStats;

/// Reserved words classified as operators rather than operands.
const KEYWORD_OPERATORS: &[&str] = &[
    "if", "else", "while", "for", "foreach", "case", "switch", "catch", "try", "return",
    "function", "const", "let", "var", "class", "new", "do", "break", "continue", "throw",
];

/// Multi-character operators, matched greedily before single characters.
const MULTI_CHAR_OPERATORS: &[&str] = &[
    "===", "!==", ">>>", "<<=", ">>=", "&&=", "||=", "??=", "...", "**=", "==", "!=", "<=", ">=",
    "&&", "||", "+=", "-=", "*=", "/=", "%=", "=>", "->", "::", "**", "??", "++", "--", "<<",
    ">>", "?.",
];

const SINGLE_CHAR_OPERATORS: &str = "+-*/%=<>!&|^~?:.,;(){}[]";

/// Compute operator/operand statistics for `text`, or `None` when the text
/// holds no countable tokens.
///
/// # Examples
///
/// ```
/// use faultline_metrics::tokens::token_stats;
///
/// assert!(token_stats("").is_none());
///
/// let stats = token_stats("total = total + 1").unwrap();
/// assert_eq!(stats.total_operands, 3);
/// assert_eq!(stats.unique_operands, 2);
/// assert_eq!(stats.total_operators, 2);
/// ```
pub fn token_stats(text: &str) -> Option<TokenStats> {
    let mut operators: HashSet<String> = HashSet::new();
    let mut operands: HashSet<String> = HashSet::new();
    let mut total_operators = 0u32;
    let mut total_operands = 0u32;

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let end = chars.get(i).map_or(text.len(), |(p, _)| *p);
            let word = &text[start..end];
            if KEYWORD_OPERATORS.contains(&word) {
                operators.insert(word.to_string());
                total_operators += 1;
            } else {
                operands.insert(word.to_string());
                total_operands += 1;
            }
            continue;
        }

        if c.is_ascii_digit() {
            let start = pos;
            while i < chars.len()
                && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '.' || chars[i].1 == '_')
            {
                i += 1;
            }
            let end = chars.get(i).map_or(text.len(), |(p, _)| *p);
            operands.insert(text[start..end].to_string());
            total_operands += 1;
            continue;
        }

        if let Some(op) = MULTI_CHAR_OPERATORS
            .iter()
            .find(|op| text[pos..].starts_with(*op))
        {
            operators.insert((*op).to_string());
            total_operators += 1;
            // Operators are ASCII, so char count equals byte count.
            i += op.len();
            continue;
        }

        if SINGLE_CHAR_OPERATORS.contains(c) {
            operators.insert(c.to_string());
            total_operators += 1;
        }
        i += 1;
    }

    let unique_operators = operators.len() as u32;
    let unique_operands = operands.len() as u32;
    let vocabulary = unique_operators + unique_operands;
    let length = total_operators + total_operands;
    if length == 0 {
        return None;
    }

    let volume = if vocabulary > 0 {
        f64::from(length) * f64::from(vocabulary).log2()
    } else {
        0.0
    };
    let difficulty = if unique_operands > 0 {
        (f64::from(unique_operators) / 2.0) * (f64::from(total_operands) / f64::from(unique_operands))
    } else {
        0.0
    };
    let effort = difficulty * volume;

    Some(TokenStats {
        total_operators,
        unique_operators,
        total_operands,
        unique_operands,
        vocabulary,
        length,
        volume,
        difficulty,
        effort,
    })
}

/// Composite maintainability score rescaled to `[0, 100]`.
///
/// `171 − 5.2·ln(volume) − 0.23·cyclomatic − 16.2·ln(loc)`, then
/// `× 100 / 171` and clamped. `None` when there is no volume or size
/// to score.
///
/// # Examples
///
/// ```
/// use faultline_metrics::tokens::maintainability;
///
/// assert!(maintainability(0.0, 1, 0).is_none());
///
/// let score = maintainability(100.0, 2, 10).unwrap();
/// assert!(score > 0.0 && score <= 100.0);
/// ```
pub fn maintainability(volume: f64, cyclomatic: u32, loc: usize) -> Option<f64> {
    if volume <= 0.0 || loc == 0 {
        return None;
    }
    let raw =
        171.0 - 5.2 * volume.ln() - 0.23 * f64::from(cyclomatic) - 16.2 * (loc as f64).ln();
    Some((raw * 100.0 / 171.0).clamp(0.0, 100.0))
}
