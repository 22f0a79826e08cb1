/*!
 * Tests for configuration loading and limits
 */

use stbatch::app_config::{
    Config, GOOGLE_MAX_BATCH_SIZE, LogLevel, PipelineConfig, ProcessingConfig, TranslatorKind,
};

#[test]
fn test_config_fromPartialJson_shouldFillDefaults() {
    let json = r#"{
        "translator": "openai",
        "provider": { "model": "qwen2", "endpoint": "http://localhost:8080/v1/chat/completions" },
        "pipeline": { "max_requests_per_minute": 30 }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.translator, TranslatorKind::OpenAI);
    assert_eq!(config.source_language, "ja");
    assert_eq!(config.target_language, "zh-CN");
    assert_eq!(config.pipeline.max_requests_per_minute, 30);
    assert_eq!(config.pipeline.max_batch_size, 1280);
    assert_eq!(config.pipeline.max_retries, 1);
    assert!(config.pipeline.single_line_fallback);
    assert_eq!(config.processing, ProcessingConfig::default());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!((config.provider.temperature - 0.05).abs() < f32::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_serializeThenParse_shouldKeepPipeline() {
    let mut config = Config::default();
    config.pipeline.max_concurrent_requests = 9;
    config.pipeline.single_line_fallback = false;

    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.pipeline, config.pipeline);
}

#[test]
fn test_effectivePipeline_forGoogle_shouldKeepLowerUserLimits() {
    let mut config = Config::default();
    config.pipeline.max_batch_size = 800;
    config.pipeline.max_requests_per_minute = 2;

    let pipeline = config.effective_pipeline();
    assert_eq!(pipeline.max_batch_size, 800);
    assert_eq!(pipeline.max_requests_per_minute, 2);
    assert!(pipeline.max_batch_size <= GOOGLE_MAX_BATCH_SIZE);
}

#[test]
fn test_resolvedProvider_shouldSubstituteLanguages() {
    let config = Config {
        source_language: "en".to_string(),
        target_language: "de".to_string(),
        ..Config::default()
    };
    let provider = config.resolved_provider();
    assert!(provider.user_prompt.contains("from en to de"));
    assert!(!provider.reference_user_prompt.contains("<target_lang>"));
    assert!(provider.user_prompt.contains("<ot>"));
}

#[test]
fn test_pipelineValidate_shouldRejectZeroLimits() {
    let valid = PipelineConfig::default();
    assert!(valid.validate().is_ok());

    for broken in [
        PipelineConfig { max_batch_size: 0, ..valid.clone() },
        PipelineConfig { max_concurrent_requests: 0, ..valid.clone() },
        PipelineConfig { max_retries: 0, ..valid.clone() },
        PipelineConfig { request_timeout_secs: 0, ..valid.clone() },
        PipelineConfig { single_line_retries: 0, ..valid.clone() },
    ] {
        assert!(broken.validate().is_err(), "{:?} should be rejected", broken);
    }
}

#[test]
fn test_translatorKind_fromStr_shouldBeCaseInsensitive() {
    assert_eq!("OpenAI".parse::<TranslatorKind>().unwrap(), TranslatorKind::OpenAI);
    assert_eq!("coze".parse::<TranslatorKind>().unwrap(), TranslatorKind::Coze);
    assert!("deepl".parse::<TranslatorKind>().is_err());
}
