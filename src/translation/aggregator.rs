/*!
 * Result aggregation.
 *
 * The result array is allocated once as a copy of the input and only ever
 * written through [`ResultAggregator`]. Its length and order never change.
 */

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, error};
use parking_lot::Mutex;

use crate::errors::{SegmentError, SegmentErrorKind, TranslationError};
use crate::subtitle_processor::Segment;

/// Progress observer called with `(completed, total)` after each segment update
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Shared, index-stable result array
pub struct ResultAggregator {
    results: Mutex<Vec<Segment>>,
    completed: AtomicUsize,
    total: usize,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ResultAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("completed", &self.completed())
            .field("total", &self.total)
            .finish()
    }
}

impl ResultAggregator {
    /// Starts from a copy of `segments`; the input itself is never touched
    pub fn new(segments: &[Segment], progress: Option<ProgressCallback>) -> Self {
        Self {
            results: Mutex::new(segments.to_vec()),
            completed: AtomicUsize::new(0),
            total: segments.len(),
            progress,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of segment updates so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Writes the translated texts of a whole batch starting at `start_index`
    pub fn apply_batch(&self, start_index: usize, texts: Vec<String>) {
        let count = texts.len();
        {
            let mut results = self.results.lock();
            for (slot, text) in results[start_index..].iter_mut().zip(texts) {
                slot.text = text;
                slot.error = None;
            }
        }

        for index in start_index..start_index + count {
            debug!("Segment {} translated", index + 1);
            self.report();
        }
    }

    /// Writes one translated segment; a success clears any earlier error
    pub fn apply_translation(&self, index: usize, text: String) {
        {
            let mut results = self.results.lock();
            let slot = &mut results[index];
            slot.text = text;
            slot.error = None;
        }
        debug!("Segment {} translated", index + 1);
        self.report();
    }

    /// Marks one segment as failed.
    ///
    /// An existing error is kept. When `fallback_text` is given it replaces the
    /// segment text as a best-effort substitute.
    pub fn mark_failed(&self, index: usize, error: &TranslationError, fallback_text: Option<&str>) {
        let tag = SegmentError::from(error);
        let id = {
            let mut results = self.results.lock();
            let slot = &mut results[index];
            if slot.error.is_none() {
                slot.error = Some(tag.clone());
            }
            if let Some(text) = fallback_text {
                slot.text = text.to_string();
            }
            slot.id.clone()
        };

        if tag.kind == SegmentErrorKind::Cancelled {
            debug!("Segment {} cancelled", id);
        } else {
            error!("Segment {} failed: {}", id, tag);
        }
        self.report();
    }

    /// Stamps the same error on every segment of `range`, keeping their texts
    pub fn mark_range_failed(&self, range: Range<usize>, error: &TranslationError) {
        let tag = SegmentError::from(error);
        let count = range.len();
        {
            let mut results = self.results.lock();
            for slot in &mut results[range.clone()] {
                if slot.error.is_none() {
                    slot.error = Some(tag.clone());
                }
            }
        }

        if tag.kind != SegmentErrorKind::Cancelled {
            error!(
                "Segments {}-{} failed: {}",
                range.start + 1,
                range.end,
                tag
            );
        }
        for _ in 0..count {
            self.report();
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Vec<Segment> {
        self.results.lock().clone()
    }

    /// Hands the result array back once all workers are done
    pub fn into_results(self) -> Vec<Segment> {
        self.results.into_inner()
    }

    fn report(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &self.progress {
            progress(completed, self.total);
        }
    }
}
