/*!
 * Concurrency, rate limiting, deadlines and cancellation.
 *
 * These tests run on a paused Tokio clock so that backend latency and
 * limiter periods cost no wall time.
 */

use std::sync::Arc;
use std::time::Duration;

use stbatch::app_config::PipelineConfig;
use stbatch::errors::SegmentErrorKind;
use stbatch::providers::mock::MockTranslator;
use stbatch::translation::TranslationPipeline;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::{fast_pipeline_config, init_test_logging, segments, texts};

/// One segment per batch for short texts
fn one_per_batch(config: PipelineConfig) -> PipelineConfig {
    init_test_logging();
    PipelineConfig {
        max_batch_size: 50,
        ..config
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_withSlowBackend_shouldNeverExceedConcurrencyLimit() {
    let input = segments(&["a", "b", "c", "d", "e", "f"]);
    let translator = MockTranslator::echo().with_delay(Duration::from_secs(1));
    let config = one_per_batch(PipelineConfig {
        max_concurrent_requests: 2,
        max_requests_per_minute: 120,
        ..fast_pipeline_config()
    });

    let output = TranslationPipeline::new(Arc::new(translator.clone()), config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(output.stats.batches, 6);
    assert!(output.is_complete());
    assert_eq!(translator.max_in_flight(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_withRateLimit_shouldSpaceRequestStarts() {
    let input = segments(&["a", "b", "c", "d"]);
    let translator = MockTranslator::echo();
    let config = one_per_batch(PipelineConfig {
        max_concurrent_requests: 4,
        max_requests_per_minute: 120,
        ..fast_pipeline_config()
    });

    let start = Instant::now();
    let output = TranslationPipeline::new(Arc::new(translator.clone()), config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    // first call immediately, then one every 500 ms
    assert!(start.elapsed() >= Duration::from_millis(1500));
    assert!(start.elapsed() < Duration::from_millis(2000));
    assert_eq!(translator.request_count(), 4);
    assert!(output.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_run_withHangingBackend_shouldTimeOutAndExhaust() {
    let input = segments(&["Hello", "World"]);
    let translator = MockTranslator::echo().with_delay(Duration::from_secs(60));
    let config = PipelineConfig {
        max_retries: 2,
        single_line_fallback: false,
        request_timeout_secs: 5,
        ..fast_pipeline_config()
    };

    let start = Instant::now();
    let output = TranslationPipeline::new(Arc::new(translator.clone()), config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(translator.request_count(), 2);
    assert_eq!(texts(&output.segments), vec!["Hello", "World"]);
    for segment in &output.segments {
        let error = segment.error.as_ref().unwrap();
        assert_eq!(error.kind, SegmentErrorKind::ExhaustedRetries);
        assert!(error.message.contains("timed out after 5 seconds"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_cancelledBeforeStart_shouldIssueNoRequests() {
    let input = segments(&["Hello", "World", "Foo"]);
    let translator = MockTranslator::echo();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let output = TranslationPipeline::new(Arc::new(translator.clone()), one_per_batch(fast_pipeline_config()))
        .run(&input, &[], &cancel, None)
        .await
        .unwrap();

    assert!(output.cancelled);
    assert!(!output.is_complete());
    assert_eq!(translator.request_count(), 0);
    assert_eq!(output.segments.len(), 3);
    assert_eq!(texts(&output.segments), vec!["Hello", "World", "Foo"]);
    assert!(
        output
            .segments
            .iter()
            .all(|s| s.error.as_ref().map(|e| e.kind) == Some(SegmentErrorKind::Cancelled))
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_cancelledMidway_shouldReturnPromptlyWithPartialResults() {
    let input = segments(&["a", "b", "c", "d"]);
    let translator = MockTranslator::prefixing("T:").with_delay(Duration::from_secs(10));
    let config = one_per_batch(PipelineConfig {
        max_concurrent_requests: 1,
        ..fast_pipeline_config()
    });
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            // the first batch finishes at 10 s, the second is still in flight
            tokio::time::sleep(Duration::from_secs(15)).await;
            cancel.cancel();
        })
    };

    let start = Instant::now();
    let output = TranslationPipeline::new(Arc::new(translator.clone()), config)
        .run(&input, &[], &cancel, None)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(20));
    assert!(output.cancelled);
    assert_eq!(translator.request_count(), 2);

    assert_eq!(output.segments[0].text, "T:a");
    assert!(output.segments[0].error.is_none());
    for segment in &output.segments[1..] {
        assert_eq!(segment.error.as_ref().map(|e| e.kind), Some(SegmentErrorKind::Cancelled));
    }
    assert_eq!(output.failed_ids(), vec!["2", "3", "4"]);
}
