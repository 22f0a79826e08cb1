/*!
 * Batch translation of subtitle segments.
 *
 * The pipeline is split into several submodules:
 *
 * - `batch`: Greedy grouping of consecutive segments under a size budget
 * - `concurrency`: Worker slots and request rate limiting
 * - `validation`: Parsing and sanity checks of backend replies
 * - `retry`: Per-batch attempts, backoff and single-line fallback
 * - `aggregator`: The shared, index-stable result array
 * - `pipeline`: Orchestration of one translation run
 */

// Re-export main types for easier usage
pub use self::aggregator::{ProgressCallback, ResultAggregator};
pub use self::batch::{Batch, next_batch, plan_batches};
pub use self::concurrency::{ConcurrencyGate, RateLimiter};
pub use self::pipeline::{PipelineOutput, PipelineStats, TranslationPipeline};
pub use self::validation::{ParsedBlock, ResponseValidator, parse_blocks};

// Submodules
pub mod aggregator;
pub mod batch;
pub mod concurrency;
pub mod pipeline;
pub mod retry;
pub mod validation;
