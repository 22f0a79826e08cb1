/*!
 * # stbatch - batched subtitle translation
 *
 * A Rust library for translating SRT subtitles through rate-limited
 * translation backends.
 *
 * ## Features
 *
 * - Greedy batching of consecutive segments under a size budget
 * - Translation backends:
 *   - Google Translate web endpoint
 *   - OpenAI-compatible chat completions
 *   - Coze bot chat
 * - Concurrency cap plus requests-per-minute rate limiting
 * - Structural validation of every reply, with retries and a line-by-line fallback
 * - Optional reference translation to guide the backend
 * - Cancellation and per-request deadlines
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT reading and writing
 * - `filters`: Pre- and post-processing of segments
 * - `translation`: The batch translation pipeline:
 *   - `translation::batch`: Segment batching
 *   - `translation::concurrency`: Worker slots and rate limiting
 *   - `translation::validation`: Reply parsing and checks
 *   - `translation::retry`: Retries and single-line fallback
 *   - `translation::aggregator`: Index-stable result collection
 *   - `translation::pipeline`: Orchestration
 * - `providers`: Translation backends
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod filters;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, PipelineConfig};
pub use errors::{AppError, ProviderError, SegmentError, SegmentErrorKind, SubtitleError, TranslationError};
pub use providers::Translator;
pub use subtitle_processor::Segment;
pub use translation::{PipelineOutput, TranslationPipeline};
