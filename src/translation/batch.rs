/*!
 * Segment batching.
 *
 * Consecutive segments are grouped greedily into the largest run whose
 * combined payload (plus the aligned reference payload) fits the size budget.
 * Sizes are counted in characters.
 */

use std::ops::Range;

use crate::errors::TranslationError;
use crate::subtitle_processor::{Segment, format_block};

/// Separator between two blocks of a payload
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// A contiguous run of segments sent as one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// First segment index (inclusive)
    pub start_index: usize,
    /// One past the last segment index
    pub end_index: usize,
    /// Blank-line separated `id\ntimespan\ntext` blocks
    pub payload: String,
    /// Same shape, built from the reference segments; empty when none exist
    pub reference_payload: String,
}

impl Batch {
    /// Number of segments in the batch
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Always false for batches produced by [`next_batch`]
    pub fn is_empty(&self) -> bool {
        self.end_index <= self.start_index
    }

    /// Segment indices covered by the batch
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Size counted against the budget
    pub fn size(&self) -> usize {
        self.payload.chars().count() + self.reference_payload.chars().count()
    }
}

/// Incrementally built payload that tracks its own character count
#[derive(Default)]
struct PayloadBuilder {
    text: String,
    chars: usize,
}

impl PayloadBuilder {
    /// Characters the payload would grow by when `block` is appended
    fn growth(&self, block_chars: usize) -> usize {
        if block_chars == 0 {
            0
        } else if self.text.is_empty() {
            block_chars
        } else {
            block_chars + BLOCK_SEPARATOR.len()
        }
    }

    fn push(&mut self, block: &str, block_chars: usize) {
        if block.is_empty() {
            return;
        }
        self.chars += self.growth(block_chars);
        if !self.text.is_empty() {
            self.text.push_str(BLOCK_SEPARATOR);
        }
        self.text.push_str(block);
    }
}

/// Produces the next batch starting at `start_index`.
///
/// The batch is extended while `payload + reference_payload` stays within
/// `max_size` characters. Reference positions without a segment contribute
/// nothing. When the first candidate alone does not fit, the run cannot
/// proceed and [`TranslationError::SegmentTooLarge`] is returned.
pub fn next_batch(
    segments: &[Segment],
    reference: &[Segment],
    start_index: usize,
    max_size: usize,
) -> Result<Batch, TranslationError> {
    let mut payload = PayloadBuilder::default();
    let mut reference_payload = PayloadBuilder::default();
    let mut end_index = start_index;

    while end_index < segments.len() {
        let block = format_block(&segments[end_index]);
        let block_chars = block.chars().count();

        let reference_block = reference.get(end_index).map(format_block).unwrap_or_default();
        let reference_chars = reference_block.chars().count();

        let total = payload.chars
            + payload.growth(block_chars)
            + reference_payload.chars
            + reference_payload.growth(reference_chars);

        if total > max_size {
            if end_index == start_index {
                return Err(TranslationError::SegmentTooLarge {
                    id: segments[start_index].id.clone(),
                    size: block_chars + reference_chars,
                    budget: max_size,
                });
            }
            break;
        }

        payload.push(&block, block_chars);
        reference_payload.push(&reference_block, reference_chars);
        end_index += 1;
    }

    Ok(Batch {
        start_index,
        end_index,
        payload: payload.text,
        reference_payload: reference_payload.text,
    })
}

/// Partitions the whole sequence into batches.
///
/// Planning happens before any request is sent, so an oversized segment
/// aborts the run without wasting requests.
pub fn plan_batches(
    segments: &[Segment],
    reference: &[Segment],
    max_size: usize,
) -> Result<Vec<Batch>, TranslationError> {
    let mut batches = Vec::new();
    let mut start_index = 0;
    while start_index < segments.len() {
        let batch = next_batch(segments, reference, start_index, max_size)?;
        start_index = batch.end_index;
        batches.push(batch);
    }
    Ok(batches)
}

/// Single-segment batch used by the line-by-line fallback
pub fn single_segment_batch(segments: &[Segment], reference: &[Segment], index: usize) -> Batch {
    Batch {
        start_index: index,
        end_index: index + 1,
        payload: format_block(&segments[index]),
        reference_payload: reference.get(index).map(format_block).unwrap_or_default(),
    }
}
