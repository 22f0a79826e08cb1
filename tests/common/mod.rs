/*!
 * Common test utilities for the stbatch test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use stbatch::app_config::PipelineConfig;
use stbatch::subtitle_processor::Segment;

/// Three short entries used across the suite
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
";

/// Routes library logs to the test output; filter with RUST_LOG
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// Segments with sequential ids and one-second timespans
pub fn segments(texts: &[&str]) -> Vec<Segment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Segment::new(
                (i + 1).to_string(),
                format!("00:00:{:02},000 --> 00:00:{:02},000", i * 2, i * 2 + 1),
                *text,
            )
        })
        .collect()
}

/// Pipeline settings that keep tests quick
pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        max_batch_size: 10_000,
        max_requests_per_minute: 60_000,
        max_concurrent_requests: 4,
        max_retries: 2,
        single_line_fallback: true,
        single_line_retries: 1,
        retry_backoff_ms: 1,
        request_timeout_secs: 5,
    }
}

/// Texts of a result, in order
pub fn texts(segments: &[Segment]) -> Vec<String> {
    segments.iter().map(|segment| segment.text.clone()).collect()
}
