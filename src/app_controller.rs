use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::filters;
use crate::providers::{self, Translator};
use crate::subtitle_processor::{self, Segment};
use crate::translation::{PipelineStats, ProgressCallback, TranslationPipeline};

// @module: Application controller for subtitle translation

/// One file to translate
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// Source SRT file
    pub source: PathBuf,
    /// Destination; derived from the source when absent
    pub destination: Option<PathBuf>,
    /// Existing translation used as guidance
    pub reference: Option<PathBuf>,
    /// Overwrite an existing destination
    pub force_overwrite: bool,
}

impl TranslationJob {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            reference: None,
            force_overwrite: false,
        }
    }
}

/// Outcome of a finished job
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Where the result was written; `None` when the job was skipped
    pub output_path: Option<PathBuf>,
    /// Number of segments written
    pub total: usize,
    /// Ids of segments that kept an error
    pub failed_ids: Vec<String>,
    /// Whether the run was interrupted
    pub cancelled: bool,
    pub stats: PipelineStats,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default destination: `<stem>.<translator>.translated.<ext>` next to the source
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitles".to_string());
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "srt".to_string());

        source.with_file_name(format!(
            "{}.{}.translated.{}",
            stem,
            self.config.translator.to_lowercase_string(),
            extension
        ))
    }

    /// Runs a job with the configured backend; Ctrl-C cancels the run and the
    /// partial result is still written
    pub async fn run(&self, job: TranslationJob) -> Result<RunReport> {
        let translator = providers::build_translator(&self.config)
            .context("Failed to create translation backend")?;

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, finishing with the segments translated so far");
                    cancel.cancel();
                }
            })
        };

        let result = self.run_with_translator(job, translator, &cancel).await;
        watcher.abort();
        result
    }

    /// Runs a job with an explicit backend and cancellation token
    pub async fn run_with_translator(
        &self,
        job: TranslationJob,
        translator: Arc<dyn Translator>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let start_time = std::time::Instant::now();

        if !job.source.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", job.source));
        }

        let output_path = job
            .destination
            .clone()
            .unwrap_or_else(|| self.output_path_for(&job.source));
        if output_path.exists() && !job.force_overwrite {
            warn!("Skipping file, translation already exists (use -f to force overwrite)");
            return Ok(RunReport {
                output_path: None,
                total: 0,
                failed_ids: Vec::new(),
                cancelled: false,
                stats: PipelineStats::default(),
            });
        }

        let segments = subtitle_processor::read_srt_file(&job.source)
            .with_context(|| format!("Failed to read subtitles: {:?}", job.source))?;
        let segments = self.preprocess(segments);

        let reference = match &job.reference {
            Some(path) => subtitle_processor::read_srt_file(path)
                .with_context(|| format!("Failed to read reference subtitles: {:?}", path))?,
            None => Vec::new(),
        };

        info!(
            "🚀 stbatch: {} ({} → {})",
            self.config.translator.display_name(),
            self.config.source_language,
            self.config.target_language
        );

        let progress_bar = Self::progress_bar(segments.len());
        let progress: ProgressCallback = {
            let pb = progress_bar.clone();
            Arc::new(move |completed, _total| pb.set_position(completed as u64))
        };

        let pipeline = TranslationPipeline::new(translator, self.config.effective_pipeline());
        let output = pipeline
            .run(&segments, &reference, cancel, Some(progress))
            .await
            .context("Translation aborted")?;
        progress_bar.finish_and_clear();

        let mut translated = output.segments;
        self.postprocess(&segments, &mut translated);

        subtitle_processor::write_srt_file(&translated, &segments, &output_path, self.config.processing.bilingual)
            .with_context(|| format!("Failed to write subtitles: {:?}", output_path))?;

        let failed_ids: Vec<String> = translated
            .iter()
            .filter(|segment| segment.is_failed())
            .map(|segment| segment.id.clone())
            .collect();

        if failed_ids.is_empty() {
            info!("Successfully translated all {} subtitle entries", translated.len());
        } else {
            error!(
                "{} of {} segments could not be translated: {}",
                failed_ids.len(),
                translated.len(),
                failed_ids.join(", ")
            );
        }
        info!("🔢 {}", output.stats.summary());
        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );

        Ok(RunReport {
            output_path: Some(output_path),
            total: translated.len(),
            failed_ids,
            cancelled: output.cancelled,
            stats: output.stats,
        })
    }

    /// Applies the enabled source filters
    pub fn preprocess(&self, mut segments: Vec<Segment>) -> Vec<Segment> {
        let processing = &self.config.processing;
        if processing.reduce_repeated_patterns {
            filters::reduce_repeated_patterns(&mut segments);
        }
        if processing.remove_repeated_characters {
            segments = filters::remove_repeated_character_segments(segments);
        }
        if processing.extend_short_segments {
            filters::extend_short_segments(&mut segments);
        }
        segments
    }

    /// Applies the enabled result filters
    pub fn postprocess(&self, originals: &[Segment], translated: &mut [Segment]) {
        if self.config.processing.trim_annotations {
            filters::trim_annotations(originals, translated);
        }
    }

    fn progress_bar(total: usize) -> ProgressBar {
        let progress_bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
