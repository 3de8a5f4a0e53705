//! Content-density estimate used to shrink chunks over technical text.

use passage_core::ChunkingConfig;

use super::types::{span_len, TextUnit};

/// Density at which the target starts to shrink.
pub const DENSE_THRESHOLD: f32 = 0.3;
/// Density at which the target reaches its floor (half the configured target).
pub const SATURATED_DENSITY: f32 = 0.6;
/// Share of a code-like token's length that counts toward density.
const CODE_TOKEN_WEIGHT: f32 = 0.5;

fn is_symbol(c: char) -> bool {
    matches!(
        c,
        '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | ';' | '=' | '+' | '*' | '/' | '\\'
            | '|' | '&' | '^' | '%' | '$' | '#' | '@' | '~' | '`' | '_' | ':'
    )
}

/// Identifiers and expressions that rarely occur in prose: paths, arrows,
/// calls, snake_case and camelCase names.
fn is_code_like(token: &str) -> bool {
    if ["::", "->", "=>", "()", "();", "==", "!="].iter().any(|p| token.contains(p)) {
        return true;
    }
    let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if trimmed.contains('_') && trimmed.chars().any(char::is_alphabetic) {
        return true;
    }
    trimmed
        .chars()
        .zip(trimmed.chars().skip(1))
        .any(|(a, b)| a.is_lowercase() && b.is_uppercase())
}

/// Score in `[0, 1]`: symbol characters plus weighted code-like tokens over
/// all non-whitespace characters.
pub fn density(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let symbols = text.chars().filter(|c| is_symbol(*c)).count() as f32;
    let code: f32 = text
        .split_whitespace()
        .filter(|t| is_code_like(t))
        .map(|t| t.chars().count() as f32 * CODE_TOKEN_WEIGHT)
        .sum();
    ((symbols + code) / total as f32).min(1.0)
}

/// Target size for a chunk starting at unit `start`.
///
/// Scores the next target-sized window of units and shrinks the target
/// linearly between [`DENSE_THRESHOLD`] and [`SATURATED_DENSITY`]. The result
/// stays within `[min, min(target * 1.5, max)]`.
pub fn effective_target(units: &[TextUnit<'_>], start: usize, config: &ChunkingConfig) -> usize {
    let target = config.target_chunk_size;
    if !config.enable_adaptive_sizing || start >= units.len() {
        return target;
    }

    let mut end = start;
    while end + 1 < units.len() && span_len(units, start, end) < target {
        end += 1;
    }
    let window: Vec<&str> = units[start..=end].iter().map(|u| u.text).collect();
    let score = density(&window.join(" "));

    let factor = if score <= DENSE_THRESHOLD {
        1.0
    } else {
        let t = ((score - DENSE_THRESHOLD) / (SATURATED_DENSITY - DENSE_THRESHOLD)).min(1.0);
        1.0 - 0.5 * t
    };

    let ceiling = (target + target / 2).min(config.max_chunk_size);
    let adapted = (target as f32 * factor).round() as usize;
    adapted.clamp(config.min_chunk_size.min(ceiling), ceiling)
}
