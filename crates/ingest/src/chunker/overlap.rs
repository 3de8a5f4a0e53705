//! Overlap injection: each chunk after the first repeats the tail of the
//! previous one, in whole units.

use std::ops::Range;

use super::types::{span_len, span_text, TextUnit};

/// First unit of the longest whole-unit suffix of `prev` spanning at most
/// `overlap` characters. Returns `prev.end` when not even the last unit fits.
/// The suffix never reaches back to `prev.start` and never enters a
/// structural block.
pub fn overlap_start(units: &[TextUnit<'_>], prev: &Range<usize>, overlap: usize) -> usize {
    let mut begin = prev.end;
    while begin > prev.start + 1 {
        let candidate = begin - 1;
        if units[candidate].structural || span_len(units, candidate, prev.end - 1) > overlap {
            break;
        }
        begin = candidate;
    }
    begin
}

/// Chunk texts for `ranges`, with overlap prepended to every chunk after the
/// first. Cut points are unchanged.
pub fn apply_overlap<'a>(
    source: &'a str,
    units: &[TextUnit<'_>],
    ranges: &[Range<usize>],
    overlap: usize,
) -> Vec<&'a str> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, range)| {
            if i == 0 || overlap == 0 {
                return span_text(source, units, range);
            }
            let begin = overlap_start(units, &ranges[i - 1], overlap);
            span_text(source, units, &(begin..range.end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::segment::segment;
    use super::*;

    const SRC: &str = "One fish. Two fish. Red fish. Blue fish. Old fish. New fish.";

    #[test]
    fn first_chunk_is_unchanged() {
        let units = segment(SRC, 100);
        let texts = apply_overlap(SRC, &units, &[0..3, 3..6], 25);
        assert_eq!(texts[0], "One fish. Two fish. Red fish.");
    }

    #[test]
    fn overlap_snaps_to_whole_units() {
        let units = segment(SRC, 100);
        // "Two fish. Red fish." is 19 chars, "One fish. Two fish. Red fish." 29.
        let texts = apply_overlap(SRC, &units, &[0..3, 3..6], 25);
        assert_eq!(texts[1], "Two fish. Red fish. Blue fish. Old fish. New fish.");
    }

    #[test]
    fn overlap_smaller_than_a_unit_adds_nothing() {
        let units = segment(SRC, 100);
        let texts = apply_overlap(SRC, &units, &[0..3, 3..6], 5);
        assert_eq!(texts[1], "Blue fish. Old fish. New fish.");
    }

    #[test]
    fn overlap_never_copies_whole_previous_chunk() {
        let units = segment(SRC, 100);
        assert_eq!(overlap_start(&units, &(0..3), 1000), 1);
    }

    #[test]
    fn structural_units_are_not_repeated() {
        let mut units = segment(SRC, 100);
        units[2].structural = true;
        assert_eq!(overlap_start(&units, &(0..3), 1000), 3);
    }

    #[test]
    fn zero_overlap_is_plain_split() {
        let units = segment(SRC, 100);
        let texts = apply_overlap(SRC, &units, &[0..3, 3..6], 0);
        assert_eq!(texts[1], "Blue fish. Old fish. New fish.");
    }
}
