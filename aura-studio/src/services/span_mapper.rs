//! Anchor provider spans to character offsets in a caption
//!
//! Providers return span *text*, sometimes with offsets that may or may not
//! be right. Each span is placed at most once, and no two placed spans may
//! overlap. Spans are handled in provider order (greedy first-fit):
//!
//! 1. A provider offset pair is kept when it is in range, non-empty, selects
//!    exactly the span text and does not overlap an already claimed range.
//! 2. Otherwise the caption is scanned from the start for the first
//!    occurrence of the span text that does not overlap a claimed range.
//!    After a rejected hit the scan resumes one character later, so
//!    overlapping occurrences ("aaa" in "aaaa") are still considered.
//! 3. Empty text or no free occurrence leaves the span unanchored.
//!
//! Offsets are counted in `char`s, half-open `[start, end)`.

use crate::models::FeedbackSpan;

/// Half-open character range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn overlaps(&self, other: &CharRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Tracks claimed ranges while placing spans over one caption
pub struct SpanMapper {
    caption: Vec<char>,
    claimed: Vec<CharRange>,
}

impl SpanMapper {
    pub fn new(caption: &str) -> Self {
        Self {
            caption: caption.chars().collect(),
            claimed: Vec::new(),
        }
    }

    /// Place one span, claiming its range on success
    pub fn place(&mut self, text: &str, hint: Option<(usize, usize)>) -> Option<CharRange> {
        let needle: Vec<char> = text.chars().collect();
        if needle.is_empty() {
            return None;
        }

        let range = hint
            .map(|(start, end)| CharRange { start, end })
            .filter(|range| self.hint_matches(range, &needle))
            .or_else(|| self.first_free_occurrence(&needle))?;

        self.claimed.push(range);
        Some(range)
    }

    fn hint_matches(&self, range: &CharRange, needle: &[char]) -> bool {
        range.start < range.end
            && range.end <= self.caption.len()
            && self.caption[range.start..range.end] == *needle
            && self.is_free(range)
    }

    fn first_free_occurrence(&self, needle: &[char]) -> Option<CharRange> {
        if needle.len() > self.caption.len() {
            return None;
        }

        (0..=self.caption.len() - needle.len())
            .filter(|&start| self.caption[start..start + needle.len()] == *needle)
            .map(|start| CharRange {
                start,
                end: start + needle.len(),
            })
            .find(|range| self.is_free(range))
    }

    fn is_free(&self, range: &CharRange) -> bool {
        !self.claimed.iter().any(|claimed| claimed.overlaps(range))
    }
}

/// Resolve offsets for every span; index `i` of the result belongs to `spans[i]`
pub fn map_spans(caption: &str, spans: &[FeedbackSpan]) -> Vec<Option<CharRange>> {
    let mut mapper = SpanMapper::new(caption);

    spans
        .iter()
        .map(|span| {
            let hint = span.start_offset.zip(span.end_offset);
            mapper.place(&span.text, hint)
        })
        .collect()
}
