//! Deterministic overlapping segmentation.
//!
//! Text is first reduced to a sequence of units (words, sentences, or paragraphs), each a byte
//! span that excludes surrounding whitespace. A window of `chunk_size` units then slides over
//! that sequence with a step of `chunk_size - overlap_size`:
//!
//! ```text
//! chunk_size = 3, overlap = 1, unit = word
//!
//! "one two three four five six"
//!
//! Chunk 0: "one two three"      units [0..3]
//! Chunk 1: "three four five"    units [2..5]   <- starts 3 - 1 = 2 units later
//! Chunk 2: "five six"           units [4..6]   <- last chunk may be shorter
//! ```
//!
//! A chunk's text is the source slice from its first unit to its last, so whitespace and
//! punctuation inside a chunk are preserved verbatim. Windowing stops as soon as a window
//! reaches the final unit. Blank input yields no chunks.

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

use super::types::{Chunk, ChunkingError, SplitConfig, SplitUnit};

/// Split `text` into overlapping chunks as described by `config`.
pub fn split(text: &str, config: &SplitConfig) -> Vec<Chunk> {
    let units = unit_spans(text, config.unit());
    let size = config.chunk_size();
    let step = config.step();

    let mut chunks = Vec::with_capacity(units.len().div_ceil(step));
    let mut first = 0;
    while first < units.len() {
        let last = (first + size).min(units.len());
        let start = units[first].start;
        let end = units[last - 1].end;
        chunks.push(Chunk {
            index: chunks.len(),
            text: text[start..end].to_string(),
            start,
            end,
        });
        if last == units.len() {
            break;
        }
        first += step;
    }

    chunks
}

/// Validate raw split parameters, then [`split`].
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap_size: usize,
    unit: SplitUnit,
) -> Result<Vec<Chunk>, ChunkingError> {
    let config = SplitConfig::new(chunk_size, overlap_size, unit)?;
    Ok(split(text, &config))
}

/// Byte spans of every unit in `text`, in source order, whitespace excluded.
pub(crate) fn unit_spans(text: &str, unit: SplitUnit) -> Vec<Range<usize>> {
    match unit {
        SplitUnit::Word => word_spans(text),
        SplitUnit::Sentence => sentence_spans(text),
        SplitUnit::Paragraph => paragraph_spans(text),
    }
}

fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Option<usize> = None;
    for (offset, ch) in text.char_indices() {
        match (ch.is_whitespace(), current) {
            (true, Some(start)) => {
                spans.push(start..offset);
                current = None;
            }
            (false, None) => current = Some(offset),
            _ => {}
        }
    }
    if let Some(start) = current {
        spans.push(start..text.len());
    }
    spans
}

fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    text.split_sentence_bound_indices()
        .filter_map(|(offset, sentence)| trimmed_span(offset, sentence))
        .collect()
}

fn paragraph_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        match trimmed_span(offset, line) {
            Some(content) => {
                current = Some(match current {
                    Some(open) => open.start..content.end,
                    None => content,
                });
            }
            None => {
                if let Some(done) = current.take() {
                    spans.push(done);
                }
            }
        }
        offset += line.len();
    }
    if let Some(done) = current {
        spans.push(done);
    }
    spans
}

/// Span of `segment` (located at `offset`) without leading and trailing whitespace.
fn trimmed_span(offset: usize, segment: &str) -> Option<Range<usize>> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }
    let leading = segment.len() - segment.trim_start().len();
    let start = offset + leading;
    Some(start..start + trimmed.len())
}
