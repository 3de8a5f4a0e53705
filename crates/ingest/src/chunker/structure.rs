//! Code-fence and list detection over the unit sequence.

use super::types::{BlockKind, StructuralBlock, TextUnit};

/// Scan units once and return the code fences and lists they form, in order.
///
/// A fence runs from a line opening with three or more backticks (or tildes)
/// to the next line opening with at least as many of the same character; an
/// unterminated fence runs to the last unit. Two or more consecutive lines
/// opening with a list marker form a list. List markers inside fences are
/// ignored.
pub fn detect_blocks(units: &[TextUnit<'_>]) -> Vec<StructuralBlock> {
    let mut blocks = Vec::new();
    // (fence char, fence length, first unit)
    let mut fence: Option<(char, usize, usize)> = None;
    // (first unit, last unit, line count)
    let mut list: Option<(usize, usize, usize)> = None;

    for (first, last) in line_groups(units) {
        let head = units[first].text;

        if let Some((ch, len, start)) = fence {
            if closes_fence(head, ch, len) {
                blocks.push(StructuralBlock {
                    kind: BlockKind::Code,
                    start_unit: start,
                    end_unit: last,
                });
                fence = None;
            }
            continue;
        }

        if let Some((ch, len)) = fence_marker(head) {
            flush_list(&mut list, &mut blocks);
            fence = Some((ch, len, first));
            continue;
        }

        if is_list_item(head) {
            list = match list {
                Some((start, _, lines)) => Some((start, last, lines + 1)),
                None => Some((first, last, 1)),
            };
        } else {
            flush_list(&mut list, &mut blocks);
        }
    }

    if let Some((_, _, start)) = fence {
        tracing::debug!(start_unit = start, "unterminated code fence runs to end of text");
        blocks.push(StructuralBlock {
            kind: BlockKind::Code,
            start_unit: start,
            end_unit: units.len() - 1,
        });
    }
    flush_list(&mut list, &mut blocks);
    blocks
}

/// Flag every unit covered by a block as structural.
pub fn mark_structural(units: &mut [TextUnit<'_>], blocks: &[StructuralBlock]) {
    for block in blocks {
        for unit in &mut units[block.start_unit..=block.end_unit] {
            unit.structural = true;
        }
    }
}

fn flush_list(list: &mut Option<(usize, usize, usize)>, blocks: &mut Vec<StructuralBlock>) {
    if let Some((start, end, lines)) = list.take() {
        if lines >= 2 {
            blocks.push(StructuralBlock {
                kind: BlockKind::List,
                start_unit: start,
                end_unit: end,
            });
        }
    }
}

/// `(first, last)` unit index of every source line that has units.
fn line_groups(units: &[TextUnit<'_>]) -> Vec<(usize, usize)> {
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for (i, unit) in units.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if !unit.line_start => group.1 = i,
            _ => groups.push((i, i)),
        }
    }
    groups
}

fn fence_marker(head: &str) -> Option<(char, usize)> {
    let ch = head.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = head.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn closes_fence(head: &str, ch: char, len: usize) -> bool {
    match fence_marker(head) {
        Some((c, l)) if c == ch && l >= len => head[l * c.len_utf8()..].trim().is_empty(),
        _ => false,
    }
}

fn is_list_item(head: &str) -> bool {
    let mut chars = head.chars();
    match chars.next() {
        Some('-' | '*' | '+' | '\u{2022}') => chars.next().is_some_and(char::is_whitespace),
        Some(c) if c.is_ascii_digit() => {
            let digits = head.bytes().take_while(u8::is_ascii_digit).count();
            let rest = &head[digits..];
            digits <= 9
                && (rest.starts_with(". ") || rest.starts_with(") ")
                    || rest.starts_with(".\t") || rest.starts_with(")\t"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::segment::segment;
    use super::*;

    fn blocks_of(src: &str) -> Vec<StructuralBlock> {
        detect_blocks(&segment(src, 1000))
    }

    #[test]
    fn fenced_code_is_one_block() {
        let src = "Intro text.\n```rust\nlet a = 1. let b = 2;\nfn x() {}\n```\nOutro.";
        let units = segment(src, 1000);
        let blocks = detect_blocks(&units);
        assert_eq!(blocks.len(), 1);
        let b = blocks[0];
        assert_eq!(b.kind, BlockKind::Code);
        assert_eq!(units[b.start_unit].text, "```rust");
        assert_eq!(units[b.end_unit].text, "```");
        assert_eq!(units[b.end_unit + 1].text, "Outro.");
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let units = segment("Text.\n~~~\ncode line\nmore code", 1000);
        let blocks = detect_blocks(&units);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_unit, 1);
        assert_eq!(blocks[0].end_unit, units.len() - 1);
    }

    #[test]
    fn shorter_or_different_fence_does_not_close() {
        let units = segment("````\n```\n~~~\ninner\n````\nafter", 1000);
        let blocks = detect_blocks(&units);
        assert_eq!(blocks.len(), 1);
        assert_eq!(units[blocks[0].end_unit].text, "````");
    }

    #[test]
    fn consecutive_list_items_merge() {
        let src = "Shopping:\n- eggs\n- milk. Fresh.\n* bread\n\n1. one\n2) two\nDone.";
        let units = segment(src, 1000);
        let blocks = detect_blocks(&units);
        assert_eq!(blocks.len(), 1);
        let b = blocks[0];
        assert_eq!(b.kind, BlockKind::List);
        assert_eq!(units[b.start_unit].text, "- eggs");
        assert_eq!(units[b.end_unit].text, "2) two");
    }

    #[test]
    fn single_list_line_is_not_a_block() {
        assert!(blocks_of("Intro.\n- only one\nOutro.").is_empty());
    }

    #[test]
    fn list_markers_inside_fence_are_ignored() {
        let blocks = blocks_of("```\n- a\n- b\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Code);
    }

    #[test]
    fn plain_prose_has_no_blocks() {
        assert!(blocks_of("Just a sentence. And 3.5 percent more -not a list.").is_empty());
    }

    #[test]
    fn marking_sets_structural_flag() {
        let mut units = segment("a\n```\nb\n```\nc", 1000);
        let blocks = detect_blocks(&units);
        mark_structural(&mut units, &blocks);
        let flags: Vec<bool> = units.iter().map(|u| u.structural).collect();
        assert_eq!(flags, vec![false, true, true, true, false]);
    }
}
