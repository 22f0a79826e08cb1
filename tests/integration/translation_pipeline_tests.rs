/*!
 * Integration tests for the batch translation pipeline.
 *
 * Every test runs the real pipeline against a scripted backend and checks the
 * returned segments, their error state and the number of backend calls.
 */

use std::sync::Arc;

use parking_lot::Mutex;
use stbatch::app_config::PipelineConfig;
use stbatch::errors::SegmentErrorKind;
use stbatch::providers::NO_CONTENT_SENTINEL;
use stbatch::providers::mock::{MockBehavior, MockTranslator};
use stbatch::subtitle_processor::{format_block, parse_srt_string};
use stbatch::translation::{ProgressCallback, TranslationPipeline};
use tokio_util::sync::CancellationToken;

use crate::common::{fast_pipeline_config, init_test_logging, segments, texts};

fn pipeline(translator: &MockTranslator, config: PipelineConfig) -> TranslationPipeline {
    init_test_logging();
    TranslationPipeline::new(Arc::new(translator.clone()), config)
}

#[tokio::test]
async fn test_run_withThreeSegmentsTranslated_shouldReplaceTextsInOrder() {
    let input = segments(&["Hello", "World", "Foo"]);
    let translator = MockTranslator::prefixing("FR:");

    let output = pipeline(&translator, fast_pipeline_config())
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(output.segments.len(), 3);
    assert_eq!(texts(&output.segments), vec!["FR:Hello", "FR:World", "FR:Foo"]);
    assert!(output.segments.iter().all(|s| s.error.is_none()));
    let ids: Vec<&str> = output.segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(translator.request_count(), 1);
    assert!(!output.cancelled);
}

#[tokio::test]
async fn test_run_withEchoBackend_shouldRoundTripWithoutRetries() {
    let owned: Vec<String> = (0..25)
        .map(|i| match i % 4 {
            0 => format!("Line {}", i),
            1 => format!("First {}\nSecond {}", i, i),
            2 => "テスト".repeat(1 + i % 4),
            _ => format!("  - Hi {}\n- Bye  ", i),
        })
        .collect();
    let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
    let input = segments(&refs);
    let translator = MockTranslator::echo();
    let config = PipelineConfig {
        max_batch_size: 180,
        ..fast_pipeline_config()
    };

    let output = pipeline(&translator, config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(output.segments, input);
    assert_eq!(output.stats.failed_attempts, 0);
    assert_eq!(output.stats.requests, output.stats.batches);
    assert_eq!(translator.request_count(), output.stats.batches);
    assert!(output.stats.batches > 1);
}

#[tokio::test]
async fn test_run_withEmptyTextEntry_shouldEchoInOneRequest() {
    let input = parse_srt_string(
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
         2\n00:00:03,000 --> 00:00:04,000\n\n\
         3\n00:00:05,000 --> 00:00:06,000\nFoo\n",
    )
    .unwrap();
    assert_eq!(input[1].text, "");
    let translator = MockTranslator::echo();

    let output = pipeline(&translator, fast_pipeline_config())
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(output.segments, input);
    assert_eq!(translator.request_count(), 1);
    assert_eq!(output.stats.failed_attempts, 0);
    assert!(output.failed_ids().is_empty());
}

#[tokio::test]
async fn test_run_withSentinelBackend_shouldFallBackOncePerSegment() {
    let input = segments(&["Hello", "World", "Foo"]);
    let translator = MockTranslator::no_content();
    let config = PipelineConfig {
        max_retries: 2,
        ..fast_pipeline_config()
    };

    let output = pipeline(&translator, config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    // two batch attempts, then one single-segment attempt per segment
    assert_eq!(translator.request_count(), 2 + 3);
    let calls = translator.calls();
    for (call, segment) in calls[2..].iter().zip(&input) {
        assert_eq!(call.text, format_block(segment));
    }

    assert_eq!(texts(&output.segments), vec!["Hello", "World", "Foo"]);
    for segment in &output.segments {
        let error = segment.error.as_ref().unwrap();
        assert_eq!(error.kind, SegmentErrorKind::ExhaustedRetries);
    }
    assert_eq!(output.failed_ids(), vec!["1", "2", "3"]);
    assert_eq!(output.stats.exhausted_batches, 1);
    assert_eq!(output.stats.single_line_attempts, 3);
}

#[tokio::test]
async fn test_run_withSentinelBackendAndReference_shouldSubstituteReference() {
    let input = segments(&["Hello", "World", "Foo"]);
    let reference = segments(&["Bonjour", "Monde"]);
    let translator = MockTranslator::no_content();

    let output = pipeline(&translator, fast_pipeline_config())
        .run(&input, &reference, &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(texts(&output.segments), vec!["Bonjour", "Monde", "Foo"]);
    assert!(output.segments.iter().all(|s| s.is_failed()));

    let calls = translator.calls();
    assert!(calls[0].reference.contains("Bonjour"));
    assert!(calls[0].reference.contains("Monde"));
    // the single-line call for segment 2 carries its aligned reference block
    let single_for_second = calls
        .iter()
        .find(|call| call.text == format_block(&input[1]))
        .unwrap();
    assert_eq!(single_for_second.reference, format_block(&reference[1]));
    assert!(calls.iter().all(|call| !call.text.starts_with(NO_CONTENT_SENTINEL)));
}

#[tokio::test]
async fn test_run_withMissingBlockAndNoFallback_shouldFailWholeBatch() {
    let input = segments(&["Hello", "World", "Foo"]);
    let translator = MockTranslator::dropping_last_block();
    let config = PipelineConfig {
        max_retries: 2,
        single_line_fallback: false,
        ..fast_pipeline_config()
    };

    let output = pipeline(&translator, config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(translator.request_count(), 2);
    assert_eq!(texts(&output.segments), vec!["Hello", "World", "Foo"]);

    let first = output.segments[0].error.clone().unwrap();
    assert_eq!(first.kind, SegmentErrorKind::ExhaustedRetries);
    assert!(first.message.contains("expected 3 blocks, got 2"));
    assert!(output.segments.iter().all(|s| s.error.as_ref() == Some(&first)));
}

#[tokio::test]
async fn test_run_withOversizeReplies_shouldRetryAndFail() {
    let input = segments(&["Hi", "Yo"]);
    let translator = MockTranslator::new(MockBehavior::Oversize);
    let config = PipelineConfig {
        max_retries: 3,
        single_line_fallback: false,
        ..fast_pipeline_config()
    };

    let output = pipeline(&translator, config)
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(translator.request_count(), 3);
    let error = output.segments[1].error.as_ref().unwrap();
    assert!(error.message.contains("characters for a source of 2"));
    assert_eq!(output.stats.failed_attempts, 3);
}

#[tokio::test]
async fn test_run_withOneDegradedReply_shouldSucceedOnRetry() {
    let input = segments(&["Hello", "World"]);
    let translator = MockTranslator::new(MockBehavior::FailFirst(1));

    let output = pipeline(&translator, fast_pipeline_config())
        .run(&input, &[], &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(output.is_complete());
    assert_eq!(texts(&output.segments), vec!["Hello", "World"]);
    assert_eq!(output.stats.requests, 2);
    assert_eq!(output.stats.failed_attempts, 1);
}

#[tokio::test]
async fn test_run_withManyBatches_shouldKeepOrderAndReportProgress() {
    let owned: Vec<String> = (1..=40).map(|i| format!("Segment number {}", i)).collect();
    let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
    let input = segments(&refs);
    let translator = MockTranslator::new(MockBehavior::Intermittent { fail_every: 4 });
    let config = PipelineConfig {
        max_batch_size: 120,
        max_concurrent_requests: 1,
        max_retries: 3,
        ..fast_pipeline_config()
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress: ProgressCallback = {
        let seen = Arc::clone(&seen);
        Arc::new(move |done, total| seen.lock().push((done, total)))
    };

    let output = pipeline(&translator, config)
        .run(&input, &[], &CancellationToken::new(), Some(progress))
        .await
        .unwrap();

    assert_eq!(output.segments, input);
    let seen = seen.lock();
    assert_eq!(seen.len(), 40);
    assert_eq!(seen.last(), Some(&(40, 40)));
    assert!(seen.windows(2).all(|pair| pair[0].0 < pair[1].0));
}
