/*!
 * Retry control for a single batch.
 *
 * A batch is attempted up to `max_retries` times. Every attempt waits for a
 * rate-limiter tick, calls the backend under a deadline and validates the
 * reply. An exhausted batch is either retried one segment at a time or failed
 * as a whole.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::PipelineConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::Translator;
use crate::subtitle_processor::Segment;

use super::aggregator::ResultAggregator;
use super::batch::{Batch, single_segment_batch};
use super::concurrency::ConcurrencyGate;
use super::validation::ResponseValidator;

/// Request accounting shared by all workers of a run
#[derive(Debug, Default)]
pub struct RequestCounters {
    /// Backend calls issued
    pub requests: AtomicUsize,
    /// Attempts that failed validation or transport
    pub failed_attempts: AtomicUsize,
    /// Batches that were exhausted
    pub exhausted_batches: AtomicUsize,
    /// Segments retried alone
    pub single_line_attempts: AtomicUsize,
}

impl RequestCounters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything a worker needs to drive its batch, borrowed from the pipeline
pub struct RetryController<'a> {
    pub translator: &'a dyn Translator,
    pub gate: &'a ConcurrencyGate,
    pub validator: &'a ResponseValidator,
    pub config: &'a PipelineConfig,
    pub cancel: &'a CancellationToken,
    pub counters: &'a RequestCounters,
}

impl RetryController<'_> {
    /// Attempts `payload` up to `max_attempts` times.
    ///
    /// # Returns
    /// * `Ok(texts)` - validated texts, one per segment of `originals`
    /// * `Err(TranslationError::Cancelled)` - the run was cancelled
    /// * `Err(TranslationError::ExhaustedRetries)` - every attempt failed
    pub async fn translate_with_retries(
        &self,
        payload: &str,
        reference: &str,
        originals: &[Segment],
        max_attempts: u32,
    ) -> Result<Vec<String>, TranslationError> {
        let max_attempts = max_attempts.max(1);
        let mut last_error = TranslationError::MalformedResponse("no attempt was made".to_string());

        for attempt in 1..=max_attempts {
            self.gate.wait_turn(self.cancel).await?;

            let outcome = self.call(payload, reference).await?;
            match self.validator.validate(outcome, originals) {
                Ok(texts) => {
                    if attempt > 1 {
                        debug!("Attempt {}/{} succeeded", attempt, max_attempts);
                    }
                    return Ok(texts);
                }
                Err(err) => {
                    RequestCounters::bump(&self.counters.failed_attempts);
                    warn!(
                        "Attempt {}/{} for {} segment(s) failed: {}",
                        attempt,
                        max_attempts,
                        originals.len(),
                        err
                    );
                    last_error = err;
                }
            }

            if attempt < max_attempts {
                self.backoff(attempt).await?;
            }
        }

        Err(TranslationError::ExhaustedRetries {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }

    /// Translates a batch and writes its outcome into `aggregator`
    pub async fn process_batch(
        &self,
        batch: &Batch,
        segments: &[Segment],
        reference: &[Segment],
        aggregator: &ResultAggregator,
    ) {
        let originals = &segments[batch.range()];
        let result = self
            .translate_with_retries(&batch.payload, &batch.reference_payload, originals, self.config.max_retries)
            .await;

        match result {
            Ok(texts) => aggregator.apply_batch(batch.start_index, texts),
            Err(TranslationError::Cancelled) => {
                aggregator.mark_range_failed(batch.range(), &TranslationError::Cancelled);
            }
            Err(exhausted) => {
                RequestCounters::bump(&self.counters.exhausted_batches);
                if self.config.single_line_fallback {
                    warn!(
                        "Batch {}-{} exhausted, retrying line by line: {}",
                        batch.start_index + 1,
                        batch.end_index,
                        exhausted
                    );
                    self.process_line_by_line(batch, segments, reference, aggregator).await;
                } else {
                    aggregator.mark_range_failed(batch.range(), &exhausted);
                }
            }
        }
    }

    /// Single-line fallback for an exhausted batch
    async fn process_line_by_line(
        &self,
        batch: &Batch,
        segments: &[Segment],
        reference: &[Segment],
        aggregator: &ResultAggregator,
    ) {
        for index in batch.range() {
            if self.cancel.is_cancelled() {
                aggregator.mark_range_failed(index..batch.end_index, &TranslationError::Cancelled);
                return;
            }

            RequestCounters::bump(&self.counters.single_line_attempts);
            let single = single_segment_batch(segments, reference, index);
            let result = self
                .translate_with_retries(
                    &single.payload,
                    &single.reference_payload,
                    &segments[index..=index],
                    self.config.single_line_retries,
                )
                .await;

            match result {
                Ok(texts) => {
                    let text = texts.into_iter().next().unwrap_or_default();
                    aggregator.apply_translation(index, text);
                }
                Err(TranslationError::Cancelled) => {
                    aggregator.mark_range_failed(index..batch.end_index, &TranslationError::Cancelled);
                    return;
                }
                Err(err) => {
                    let substitute = reference.get(index).map(|r| r.text.as_str());
                    if substitute.is_some() {
                        debug!("Segment {} falls back to its reference text", segments[index].id);
                    }
                    aggregator.mark_failed(index, &err, substitute);
                }
            }
        }
    }

    /// One backend call under the per-call deadline.
    ///
    /// The outer error only reports cancellation; backend failures are
    /// returned in the inner result for validation.
    async fn call(&self, payload: &str, reference: &str) -> Result<Result<String, ProviderError>, TranslationError> {
        RequestCounters::bump(&self.counters.requests);
        let deadline = self.config.request_timeout();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TranslationError::Cancelled),
            outcome = tokio::time::timeout(deadline, self.translator.translate(payload, reference)) => {
                Ok(outcome.unwrap_or_else(|_| Err(ProviderError::Timeout(deadline.as_secs()))))
            }
        }
    }

    /// Linear backoff after failed attempt `attempt`
    async fn backoff(&self, attempt: u32) -> Result<(), TranslationError> {
        let delay = self.config.backoff_for(attempt);
        if delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TranslationError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
