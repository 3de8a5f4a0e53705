//! Unit segmentation: sentences and lines with source offsets.

use super::types::TextUnit;

/// Split `source` into ordered units.
///
/// Lines are split first, then sentences within each line (`.`, `!` or `?`
/// followed by whitespace). Separator whitespace is dropped; everything else
/// lands in exactly one unit. A unit plus the whitespace run before it spans
/// at most `split_limit` characters: longer units are broken at whitespace,
/// or at a hard character boundary when they have none. Only a whitespace run
/// that is itself `split_limit` characters or longer can exceed it.
pub fn segment(source: &str, split_limit: usize) -> Vec<TextUnit<'_>> {
    let limit = split_limit.max(1);
    let mut units = Vec::new();
    let mut cursor = CharCursor::default();
    let mut line_offset = 0usize;
    let mut prev_end: Option<usize> = None;

    for (line_no, line) in source.split('\n').enumerate() {
        let mut first_on_line = true;
        for (a, b) in sentence_spans(line) {
            let lead_gap = prev_end.map_or(0, |p| source[p..line_offset + a].chars().count());
            let mut pieces = Vec::new();
            split_long(&line[a..b], a, lead_gap, limit, &mut pieces);
            for (ps, pe) in pieces {
                let start = line_offset + ps;
                let end = line_offset + pe;
                let char_start = cursor.advance_to(source, start);
                let char_end = cursor.advance_to(source, end);
                units.push(TextUnit {
                    text: &source[start..end],
                    start,
                    end,
                    char_start,
                    char_end,
                    line: line_no,
                    line_start: first_on_line,
                    structural: false,
                });
                first_on_line = false;
                prev_end = Some(end);
            }
        }
        line_offset += line.len() + 1;
    }
    units
}

/// Running byte → character position conversion over one source string.
#[derive(Default)]
struct CharCursor {
    byte: usize,
    chars: usize,
}

impl CharCursor {
    fn advance_to(&mut self, source: &str, byte: usize) -> usize {
        self.chars += source[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

/// Trimmed, non-empty sentence spans of one line, as byte ranges into it.
fn sentence_spans(line: &str) -> Vec<(usize, usize)> {
    let mut raw = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }
        // "1." opening a numbered list item is a marker, not a sentence.
        let so_far = line[start..i].trim();
        if c == '.' && !so_far.is_empty() && so_far.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, n)) = chars.peek() {
            if is_terminal(n) || is_closing(n) {
                end = j + n.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if matches!(chars.peek(), Some(&(_, n)) if n.is_whitespace()) {
            raw.push((start, end));
            start = end;
        }
    }
    if start < line.len() {
        raw.push((start, line.len()));
    }

    raw.into_iter()
        .filter_map(|(a, b)| {
            let s = &line[a..b];
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let lead = s.len() - s.trim_start().len();
            Some((a + lead, a + lead + trimmed.len()))
        })
        .collect()
}

/// Byte ranges of whitespace-separated words in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), word_start) {
            (true, Some(ws)) => {
                spans.push((ws, i));
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }
    if let Some(ws) = word_start {
        spans.push((ws, text.len()));
    }
    spans
}

/// Push `text` (located at `base`) as pieces whose length plus the gap
/// before them is at most `limit` characters. `lead_gap` is the whitespace
/// run between the previous unit and `text`.
fn split_long(
    text: &str,
    base: usize,
    lead_gap: usize,
    limit: usize,
    out: &mut Vec<(usize, usize)>,
) {
    let room = |gap: usize| limit.saturating_sub(gap).max(1);
    if text.chars().count() <= room(lead_gap) {
        out.push((base, base + text.len()));
        return;
    }

    // (start, end, chars, room) of the piece being grown
    let mut piece: Option<(usize, usize, usize, usize)> = None;

    for (ws, we) in word_spans(text) {
        let word = &text[ws..we];
        let word_chars = word.chars().count();

        let gap = match piece {
            Some((ps, pe, pc, cap)) => {
                let gap = text[pe..ws].chars().count();
                if pc + gap + word_chars <= cap {
                    piece = Some((ps, we, pc + gap + word_chars, cap));
                    continue;
                }
                out.push((base + ps, base + pe));
                gap
            }
            None => lead_gap,
        };

        // Start a new piece at this word, hard-cutting it when it is too long.
        let mut cap = room(gap);
        let mut cut_start = ws;
        let mut count = 0;
        for (off, _) in word.char_indices() {
            if count == cap {
                out.push((base + cut_start, base + ws + off));
                cut_start = ws + off;
                count = 0;
                cap = limit;
            }
            count += 1;
        }
        piece = Some((cut_start, we, count, cap));
    }

    if let Some((ps, pe, _, _)) = piece {
        out.push((base + ps, base + pe));
    }
}
