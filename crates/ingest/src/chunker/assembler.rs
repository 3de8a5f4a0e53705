//! Size-constrained assembly of units into chunk ranges.

use std::ops::Range;

use passage_core::ChunkingConfig;

use super::density::effective_target;
use super::types::{span_len, Boundaries, StructuralBlock, TextUnit};

/// How many unit gaps past the target the assembler searches for a
/// candidate boundary before cutting at the current one.
pub const LOOKAHEAD_UNITS: usize = 8;

/// Group `units` into contiguous, non-empty unit ranges covering all units.
///
/// Every range lies within `[min, max]` characters except where a structural
/// block is larger than `max`, the text itself is shorter than `min`, or a
/// single unit forces it.
pub fn assemble(
    units: &[TextUnit<'_>],
    blocks: &[StructuralBlock],
    boundaries: &Boundaries,
    config: &ChunkingConfig,
) -> Vec<Range<usize>> {
    let n = units.len();
    if n == 0 {
        return Vec::new();
    }

    let min = config.min_chunk_size;
    let max = config.max_chunk_size;

    let mut block_end: Vec<Option<usize>> = vec![None; n];
    for block in blocks {
        block_end[block.start_unit] = Some(block.end_unit);
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut target = effective_target(units, 0, config);
    let mut i = 0;

    while i < n {
        // ── Structural block: committed whole ──
        if let Some(end) = block_end[i] {
            if i > start
                && span_len(units, start, i - 1) >= min
                && span_len(units, start, end) > max
            {
                ranges.push(start..i);
                start = i;
                target = effective_target(units, start, config);
            }
            i = end + 1;
            let len = span_len(units, start, end);
            if len > max || len >= target.max(min) {
                ranges.push(start..i);
                start = i;
                target = effective_target(units, start, config);
            }
            continue;
        }

        // ── Plain unit ──
        if i > start && span_len(units, start, i) > max {
            ranges.push(start..i);
            start = i;
            target = effective_target(units, start, config);
            continue;
        }

        if span_len(units, start, i) >= target.max(min) {
            let cut = choose_cut(units, &block_end, boundaries, start, i + 1, config);
            ranges.push(start..cut);
            start = cut;
            i = cut;
            target = effective_target(units, start, config);
            continue;
        }

        i += 1;
    }

    if start < n {
        ranges.push(start..n);
    }

    rebalance_tail(units, &mut ranges, config);
    ranges
}

/// Cut position for a buffer starting at `start` that reached its target at
/// gap `at`: `at` itself if it is a candidate, else the nearest candidate in
/// the look-ahead window, else `at`. The end of the text counts as a
/// candidate when the rest of the text is shorter than `min`. The window
/// never grows the buffer past `max` and never enters a structural block.
fn choose_cut(
    units: &[TextUnit<'_>],
    block_end: &[Option<usize>],
    boundaries: &Boundaries,
    start: usize,
    at: usize,
    config: &ChunkingConfig,
) -> usize {
    let n = units.len();
    if at >= n || boundaries.is_candidate(at) {
        return at;
    }
    let short_tail = span_len(units, at, n - 1) < config.min_chunk_size;
    let is_cut = |p: usize| boundaries.is_candidate(p) || (p == n && short_tail);

    for p in at + 1..=(at + LOOKAHEAD_UNITS).min(n) {
        let last = p - 1;
        if block_end[last].is_some() || span_len(units, start, last) > config.max_chunk_size {
            break;
        }
        if is_cut(p) {
            return p;
        }
    }
    at
}

/// Lift an undersized final range to `min`: first by moving trailing units of
/// the previous range into it (while the previous range stays at or above
/// `min`), then by merging the two when the result fits within `max`, and
/// last by re-cutting the trailing ranges evenly.
fn rebalance_tail(units: &[TextUnit<'_>], ranges: &mut Vec<Range<usize>>, config: &ChunkingConfig) {
    let min = config.min_chunk_size;
    let max = config.max_chunk_size;
    let k = ranges.len();
    if k < 2 {
        return;
    }

    let len = |r: &Range<usize>| span_len(units, r.start, r.end - 1);
    if len(&ranges[k - 1]) >= min {
        return;
    }

    let mut prev = ranges[k - 2].clone();
    let mut last = ranges[k - 1].clone();
    while len(&last) < min && prev.len() > 1 {
        let moved = prev.end - 1;
        if units[moved].structural {
            break;
        }
        let shorter = prev.start..moved;
        let longer = moved..last.end;
        if len(&shorter) < min || len(&longer) > max {
            break;
        }
        prev = shorter;
        last = longer;
    }

    if len(&last) >= min {
        tracing::debug!(moved = ranges[k - 1].start - last.start, "rebalanced final chunk");
        ranges[k - 2] = prev;
        ranges[k - 1] = last;
        return;
    }

    let merged = ranges[k - 2].start..ranges[k - 1].end;
    if len(&merged) <= max {
        ranges.truncate(k - 2);
        ranges.push(merged);
    } else if let Some(recut) = recut_tail(units, ranges, config) {
        tracing::debug!(before = k, after = recut.len(), "re-cut trailing chunks");
        *ranges = recut;
    } else {
        ranges[k - 2] = prev;
        ranges[k - 1] = last;
    }
}

/// Re-cut the trailing ranges so that every range fits `[min, max]`.
///
/// Widens the re-cut span one range at a time, going backwards. For each
/// span every chunk count whose average fits the window is tried, the one
/// nearest the target first. `None` when no span can be re-cut.
fn recut_tail(
    units: &[TextUnit<'_>],
    ranges: &[Range<usize>],
    config: &ChunkingConfig,
) -> Option<Vec<Range<usize>>> {
    let n = units.len();
    let (min, max) = (config.min_chunk_size, config.max_chunk_size);

    for from in (0..ranges.len().saturating_sub(1)).rev() {
        let start = ranges[from].start;
        let total = span_len(units, start, n - 1);
        let mut counts: Vec<usize> = (total.div_ceil(max).max(1)..=total / min).collect();
        counts.sort_by_key(|&c| (total / c).abs_diff(config.target_chunk_size));

        for count in counts {
            if let Some(cuts) = even_cuts(units, start, count, config) {
                let mut out = ranges[..from].to_vec();
                out.extend(cuts);
                return Some(out);
            }
        }
    }
    None
}

/// Cut `units[start..]` into `count` ranges within `[min, max]`, each as close
/// as it can get to an equal share of what is left. Never cuts between two
/// structural units.
fn even_cuts(
    units: &[TextUnit<'_>],
    start: usize,
    count: usize,
    config: &ChunkingConfig,
) -> Option<Vec<Range<usize>>> {
    let n = units.len();
    let (min, max) = (config.min_chunk_size, config.max_chunk_size);
    let mut cuts = Vec::with_capacity(count);
    let mut from = start;

    for left in (2..=count).rev() {
        let share = span_len(units, from, n - 1) / left;
        let rest_window = (left - 1) * min..=(left - 1) * max;

        // (last unit, distance from the share)
        let mut best: Option<(usize, usize)> = None;
        for last in from..n - 1 {
            let len = span_len(units, from, last);
            if len > max {
                break;
            }
            if len < min
                || (units[last].structural && units[last + 1].structural)
                || !rest_window.contains(&span_len(units, last + 1, n - 1))
            {
                continue;
            }
            let miss = len.abs_diff(share);
            if best.map_or(true, |(_, m)| miss < m) {
                best = Some((last, miss));
            }
        }

        let (last, _) = best?;
        cuts.push(from..last + 1);
        from = last + 1;
    }

    let len = span_len(units, from, n - 1);
    if len < min || len > max {
        return None;
    }
    cuts.push(from..n);
    Some(cuts)
}
