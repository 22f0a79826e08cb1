/*!
 * The batch translation pipeline.
 *
 * Plans batches, runs one worker per batch behind the concurrency gate and
 * collects the per-segment outcome into an index-stable result array. The
 * call returns only after every worker has finished.
 */

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::PipelineConfig;
use crate::errors::TranslationError;
use crate::providers::Translator;
use crate::subtitle_processor::Segment;

use super::aggregator::{ProgressCallback, ResultAggregator};
use super::batch::plan_batches;
use super::concurrency::ConcurrencyGate;
use super::retry::{RequestCounters, RetryController};
use super::validation::ResponseValidator;

/// Counters of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Batches planned
    pub batches: usize,
    /// Backend calls issued, including retries and single-line calls
    pub requests: usize,
    /// Attempts rejected by transport or validation
    pub failed_attempts: usize,
    /// Batches that used up their attempts
    pub exhausted_batches: usize,
    /// Segments retried alone after their batch was exhausted
    pub single_line_attempts: usize,
    /// Segments without error
    pub translated: usize,
    /// Segments carrying an error
    pub failed: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl PipelineStats {
    /// Generate a summary of the run
    pub fn summary(&self) -> String {
        format!(
            "Translation Summary:\n\
             Batches: {}\n\
             Requests: {}\n\
             Failed attempts: {}\n\
             Exhausted batches: {}\n\
             Single-line retries: {}\n\
             Translated segments: {}\n\
             Failed segments: {}\n\
             Elapsed time: {:.2} minutes",
            self.batches,
            self.requests,
            self.failed_attempts,
            self.exhausted_batches,
            self.single_line_attempts,
            self.translated,
            self.failed,
            self.elapsed.as_secs_f64() / 60.0
        )
    }
}

/// Result of one pipeline invocation
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Same length and order as the input
    pub segments: Vec<Segment>,
    /// Whether the run was cancelled before finishing
    pub cancelled: bool,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// Ids of the segments that carry an error
    pub fn failed_ids(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|segment| segment.is_failed())
            .map(|segment| segment.id.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.stats.failed == 0
    }
}

/// Batched, rate-limited translation of a segment sequence
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    validator: ResponseValidator,
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig) -> Self {
        Self {
            translator,
            config,
            validator: ResponseValidator::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Translates `segments`, optionally guided by a parallel `reference`.
    ///
    /// Per-batch failures never fail the call; they end up as per-segment
    /// errors in the output. The only error returned is
    /// [`TranslationError::SegmentTooLarge`], raised before any request.
    pub async fn run(
        &self,
        segments: &[Segment],
        reference: &[Segment],
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<PipelineOutput, TranslationError> {
        let start = Instant::now();
        let batches = plan_batches(segments, reference, self.config.max_batch_size)?;

        info!(
            "Translating {} segments in {} batches with {} ({} concurrent, {} requests/minute)",
            segments.len(),
            batches.len(),
            self.translator.name(),
            self.config.max_concurrent_requests,
            self.config.max_requests_per_minute
        );

        let gate = ConcurrencyGate::from_config(&self.config);
        let aggregator = ResultAggregator::new(segments, progress);
        let counters = RequestCounters::default();
        let controller = RetryController {
            translator: self.translator.as_ref(),
            gate: &gate,
            validator: &self.validator,
            config: &self.config,
            cancel,
            counters: &counters,
        };

        let controller = &controller;
        let aggregator_ref = &aggregator;
        let gate_ref = &gate;

        stream::iter(batches.iter())
            .map(|batch| async move {
                match gate_ref.acquire(cancel).await {
                    Ok(_permit) => {
                        controller.process_batch(batch, segments, reference, aggregator_ref).await;
                    }
                    Err(err) => aggregator_ref.mark_range_failed(batch.range(), &err),
                }
            })
            .buffer_unordered(gate.max_concurrent())
            .collect::<Vec<()>>()
            .await;

        let cancelled = cancel.is_cancelled();
        let results = aggregator.into_results();
        let failed = results.iter().filter(|segment| segment.is_failed()).count();

        let stats = PipelineStats {
            batches: batches.len(),
            requests: counters.requests.load(Ordering::Relaxed),
            failed_attempts: counters.failed_attempts.load(Ordering::Relaxed),
            exhausted_batches: counters.exhausted_batches.load(Ordering::Relaxed),
            single_line_attempts: counters.single_line_attempts.load(Ordering::Relaxed),
            translated: results.len() - failed,
            failed,
            elapsed: start.elapsed(),
        };

        if cancelled {
            warn!("Translation cancelled, {} segments left untranslated", failed);
        } else {
            info!("Translation finished: {} translated, {} failed", stats.translated, failed);
        }

        Ok(PipelineOutput {
            segments: results,
            cancelled,
            stats,
        })
    }
}
