//! Fixed-window chunking for calls without a similarity signal.

use std::ops::Range;

use passage_core::ChunkingConfig;

/// Split `text` into windows of `target_chunk_size` characters.
///
/// Each window is cut after the last `.` or newline found in its second
/// half, or at the window edge when there is none. The next window starts
/// `overlap` characters before the cut. A final piece under `min_chunk_size`
/// is folded into the previous one when the result fits `max_chunk_size`.
///
/// `keep_whole` holds sorted character ranges (code fences, lists) that no
/// cut may fall inside: a cut is moved back to the start of the range, or
/// past its end when the window opens on it. Overlap never starts inside one.
pub fn fixed_windows<'a>(
    text: &'a str,
    config: &ChunkingConfig,
    keep_whole: &[Range<usize>],
) -> Vec<&'a str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let n = chars.len();
    let byte_at = |pos: usize| chars.get(pos).map_or(text.len(), |(b, _)| *b);
    let target = config.target_chunk_size.max(1);
    let enclosing = |pos: usize| keep_whole.iter().find(|r| r.start < pos && pos < r.end);

    // (start, end) character positions, before trimming
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    while start < n {
        let edge = (start + target).min(n);
        let mut cut = edge;
        if edge < n {
            let half = start + target / 2;
            if let Some(p) = (half + 1..edge).rev().find(|&p| matches!(chars[p].1, '.' | '\n')) {
                cut = p + 1;
            }
        }
        if let Some(block) = enclosing(cut) {
            cut = if block.start > start { block.start } else { block.end.min(n) };
        }
        spans.push((start, cut));
        if cut >= n {
            break;
        }
        let mut next = cut.saturating_sub(config.overlap);
        if let Some(block) = enclosing(next) {
            next = block.end;
        }
        start = if next > start && next <= cut { next } else { cut };
    }

    let mut pieces: Vec<(usize, usize)> = spans
        .into_iter()
        .filter(|&(s, e)| !text[byte_at(s)..byte_at(e)].trim().is_empty())
        .collect();

    if pieces.len() >= 2 {
        let (last_start, last_end) = pieces[pieces.len() - 1];
        let (prev_start, _) = pieces[pieces.len() - 2];
        let last_len = text[byte_at(last_start)..byte_at(last_end)].trim().chars().count();
        let merged_len = text[byte_at(prev_start)..byte_at(last_end)].trim().chars().count();
        if last_len < config.min_chunk_size && merged_len <= config.max_chunk_size {
            pieces.pop();
            if let Some(prev) = pieces.last_mut() {
                prev.1 = last_end;
            }
        }
    }

    pieces
        .into_iter()
        .map(|(s, e)| text[byte_at(s)..byte_at(e)].trim())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target: usize, min: usize, max: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig::default()
            .with_sizes(target, min, max)
            .with_overlap(overlap)
    }

    #[test]
    fn short_text_is_one_piece() {
        let pieces = fixed_windows("  Hello there.  ", &config(100, 50, 200, 10), &[]);
        assert_eq!(pieces, vec!["Hello there."]);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(fixed_windows(" \n\t ", &config(100, 50, 200, 10), &[]).is_empty());
    }

    #[test]
    fn cuts_after_period_in_second_half() {
        // Period at char 69 of a 100-char window.
        let text = format!("{}. {}", "a".repeat(69), "b".repeat(200));
        let pieces = fixed_windows(&text, &config(100, 10, 300, 0), &[]);
        assert_eq!(pieces[0], format!("{}.", "a".repeat(69)));
    }

    #[test]
    fn period_in_first_half_is_ignored() {
        let text = format!("{}. {}", "a".repeat(20), "b".repeat(200));
        let pieces = fixed_windows(&text, &config(100, 10, 300, 0), &[]);
        assert_eq!(pieces[0].chars().count(), 100);
    }

    #[test]
    fn windows_overlap() {
        let text: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let pieces = fixed_windows(&text, &config(100, 10, 300, 20), &[]);
        assert_eq!(pieces[0].chars().count(), 100);
        assert_eq!(&pieces[0][80..], &pieces[1][..20]);
    }

    #[test]
    fn overlap_larger_than_window_still_advances() {
        let text = "x".repeat(1000);
        let pieces = fixed_windows(&text, &config(10, 5, 20, 50), &[]);
        assert_eq!(pieces.len(), 100);
    }

    #[test]
    fn short_final_piece_is_folded_in() {
        let text = "y".repeat(230);
        let pieces = fixed_windows(&text, &config(100, 50, 200, 0), &[]);
        // 100 + 100 + 30: the 30-char tail joins the second piece.
        let lens: Vec<usize> = pieces.iter().map(|p| p.chars().count()).collect();
        assert_eq!(lens, vec![100, 130]);
    }

    #[test]
    fn cuts_never_fall_inside_kept_ranges() {
        // 150 plain chars, a 120-char block, 150 plain chars.
        let text = format!("{}{}{}", "p".repeat(150), "k".repeat(120), "q".repeat(150));
        let block = 150..270;
        let pieces = fixed_windows(&text, &config(100, 10, 300, 30), &[block]);

        let holders = pieces.iter().filter(|p| p.contains(&"k".repeat(120))).count();
        assert_eq!(holders, 1);
        for piece in &pieces {
            let ks = piece.matches('k').count();
            assert!(ks == 0 || ks == 120, "piece holds part of the block: {piece}");
        }
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(250);
        let pieces = fixed_windows(&text, &config(100, 10, 300, 10), &[]);
        assert!(pieces.iter().all(|p| p.chars().count() <= 100));
        assert_eq!(pieces[0].chars().count(), 100);
    }
}
