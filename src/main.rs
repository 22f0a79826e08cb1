// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use stbatch::app_config::{self, Config, TranslatorKind};
use stbatch::app_controller::{Controller, TranslationJob};

/// CLI Wrapper for TranslatorKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslator {
    Google,
    #[value(name = "openai")]
    OpenAI,
    Coze,
}

impl From<CliTranslator> for TranslatorKind {
    fn from(cli_translator: CliTranslator) -> Self {
        match cli_translator {
            CliTranslator::Google => TranslatorKind::Google,
            CliTranslator::OpenAI => TranslatorKind::OpenAI,
            CliTranslator::Coze => TranslatorKind::Coze,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for stbatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Clone)]
struct TranslateArgs {
    /// Source SRT file
    #[arg(value_name = "SOURCE_SRT")]
    source: Option<PathBuf>,

    /// Destination SRT file (default: <stem>.<translator>.translated.srt)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Existing translation used as reference
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Force overwrite of an existing destination
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation backend to use
    #[arg(long, value_enum)]
    translator: Option<CliTranslator>,

    /// Model name (OpenAI-compatible backends)
    #[arg(short, long)]
    model: Option<String>,

    /// API endpoint URL
    #[arg(long)]
    api_url: Option<String>,

    /// API key
    #[arg(long, env = "STBATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Source language code (e.g., 'ja', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh-CN', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Maximum characters per request
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Maximum requests per minute
    #[arg(long)]
    max_rpm: Option<u32>,

    /// Maximum requests in flight
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Attempts per batch
    #[arg(long)]
    max_retries: Option<u32>,

    /// Do not retry failed batches line by line
    #[arg(long)]
    no_single_line: bool,

    /// Write original and translated text together
    #[arg(long)]
    bilingual: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// stbatch - batched subtitle translation
///
/// Translates SRT subtitles in batches through Google Translate, an
/// OpenAI-compatible API or a Coze bot, respecting the backend's rate limits.
#[derive(Parser, Debug)]
#[command(name = "stbatch")]
#[command(version)]
#[command(about = "Batched, rate-limited subtitle translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "stbatch translates SRT subtitles in batches, validates every reply and retries failed batches line by line.

EXAMPLES:
    stbatch movie.srt                                   # Translate using default config
    stbatch --translator openai -m gpt-4o movie.srt     # Use an OpenAI-compatible backend
    stbatch -s en -t fr movie.srt                       # Translate from English to French
    stbatch -r movie.en.srt movie.ja.srt                # Guide the backend with a reference translation
    stbatch --max-rpm 20 --max-concurrent 4 movie.srt   # Raise the request budget
    stbatch completions bash > stbatch.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. Command line options override the file.

SUPPORTED TRANSLATORS:
    google - Google Translate web endpoint (max 5000 characters, 3 requests/minute)
    openai - OpenAI-compatible chat completions (requires --api-url and --model)
    coze   - Coze bot chat (requires api_url, api_key and bot_id)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation; filtering follows `log::max_level()`
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger);
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Emoji for log level
    fn emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "stbatch", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Loads the config file, creating it with defaults when missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

/// Command line options take precedence over the file
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(translator) = &options.translator {
        config.translator = translator.clone().into();
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if let Some(api_url) = &options.api_url {
        config.provider.endpoint = api_url.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.provider.api_key = api_key.clone();
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(max_batch_size) = options.max_batch_size {
        config.pipeline.max_batch_size = max_batch_size;
    }
    if let Some(max_rpm) = options.max_rpm {
        config.pipeline.max_requests_per_minute = max_rpm;
    }
    if let Some(max_concurrent) = options.max_concurrent {
        config.pipeline.max_concurrent_requests = max_concurrent;
    }
    if let Some(max_retries) = options.max_retries {
        config.pipeline.max_retries = max_retries;
    }
    if options.no_single_line {
        config.pipeline.single_line_fallback = false;
    }
    if options.bilingual {
        config.processing.bilingual = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    let source = options
        .source
        .ok_or_else(|| anyhow!("SOURCE_SRT is required"))?;

    let controller = Controller::with_config(config)?;
    let job = TranslationJob {
        source,
        destination: options.dest,
        reference: options.reference,
        force_overwrite: options.force_overwrite,
    };

    let report = controller.run(job).await?;
    if report.cancelled {
        warn!("Run was interrupted; untranslated segments keep their original text");
    }
    if let Some(path) = &report.output_path {
        info!("Wrote {} segments to {}", report.total, path.display());
    }

    Ok(())
}
