//! Intermediate types shared by the chunking stages.

use std::ops::Range;

use crate::embedding::EmbeddingError;

// ── Units ───────────────────────────────────────────────────────────────────

/// An atomic span of the source text: a sentence, a line, or a piece of an
/// overlong sentence. Units are never split by later stages.
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit<'a> {
    /// Trimmed unit text, borrowed from the source.
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub start: usize,
    /// Byte offset one past the end of `text`.
    pub end: usize,
    /// Character position of `start`.
    pub char_start: usize,
    /// Character position of `end`.
    pub char_end: usize,
    /// 0-based source line the unit starts on.
    pub line: usize,
    /// Whether this is the first unit on its line.
    pub line_start: bool,
    /// Set when the unit lies inside a code fence or list.
    pub structural: bool,
}

impl TextUnit<'_> {
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Character length of the source span covering `units[first..=last]`,
/// separators between units included.
pub(crate) fn span_len(units: &[TextUnit<'_>], first: usize, last: usize) -> usize {
    units[last].char_end - units[first].char_start
}

/// Source text covered by a range of units.
pub(crate) fn span_text<'a>(source: &'a str, units: &[TextUnit<'_>], range: &Range<usize>) -> &'a str {
    &source[units[range.start].start..units[range.end - 1].end]
}

// ── Structural blocks ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Code,
    List,
}

/// A run of units (`start_unit..=end_unit`) that must stay in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralBlock {
    pub kind: BlockKind,
    pub start_unit: usize,
    pub end_unit: usize,
}

// ── Boundaries ──────────────────────────────────────────────────────────────

/// Preferred cut points. Position `i` is the gap between unit `i - 1` and
/// unit `i`; position 0 is never a candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundaries {
    candidates: Vec<bool>,
}

impl Boundaries {
    /// No preferred cut points at all.
    pub fn none(unit_count: usize) -> Self {
        Self {
            candidates: vec![false; unit_count],
        }
    }

    /// `similarities[i]` scores units `i` and `i + 1`.
    pub fn from_similarities(similarities: &[f32], threshold: f32) -> Self {
        let mut candidates = vec![false; similarities.len() + 1];
        for (i, sim) in similarities.iter().enumerate() {
            candidates[i + 1] = *sim < threshold;
        }
        Self { candidates }
    }

    pub fn is_candidate(&self, position: usize) -> bool {
        self.candidates.get(position).copied().unwrap_or(false)
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(|(i, _)| i)
    }

    pub fn count(&self) -> usize {
        self.candidates.iter().filter(|c| **c).count()
    }
}

// ── Path selection ──────────────────────────────────────────────────────────

/// Why a call skipped the semantic path.
#[derive(Debug)]
pub enum FallbackReason {
    /// No embedding provider was configured.
    NoProvider,
    /// The provider failed, timed out, or returned a malformed response.
    ProviderFailed(EmbeddingError),
}

/// Outcome of the boundary-detection step; decides how a whole call is chunked.
#[derive(Debug)]
pub enum ChunkingPath {
    Semantic(Boundaries),
    Fallback(FallbackReason),
}

impl ChunkingPath {
    pub fn is_semantic(&self) -> bool {
        matches!(self, ChunkingPath::Semantic(_))
    }
}
