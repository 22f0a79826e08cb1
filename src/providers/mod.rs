/*!
 * Translation backends.
 *
 * Every backend implements the single-method [`Translator`] capability:
 * - Google: public web translation endpoint
 * - OpenAI: OpenAI-compatible chat completions API
 * - Coze: Coze bot chat API
 * - Mock: scripted backend for tests
 *
 * The backend is chosen once at startup by [`build_translator`] and shared by
 * all pipeline workers.
 */

use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslatorKind};
use crate::errors::ProviderError;

pub mod coze;
pub mod google;
pub mod mock;
pub mod openai;

/// Marker prefixed to a degraded response that carried no content.
///
/// Backends return `"{NO_CONTENT_SENTINEL}{original}"` instead of an empty
/// string so that the response validator treats it as retryable rather than
/// as a legitimately empty translation.
pub const NO_CONTENT_SENTINEL: &str = "[STGERROR]";

/// Builds the degraded "no content" result for `original`
pub fn no_content(original: &str) -> String {
    format!("{}{}", NO_CONTENT_SENTINEL, original)
}

/// Common capability of all translation backends
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate `text`, optionally guided by an existing `reference` translation.
    ///
    /// `reference` is empty when no reference is available.
    ///
    /// # Returns
    /// * `Ok(text)` - the translation, or a [`NO_CONTENT_SENTINEL`]-prefixed
    ///   string when the backend produced nothing
    /// * `Err(ProviderError)` - transport or API failure
    async fn translate(&self, text: &str, reference: &str) -> Result<String, ProviderError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Creates the backend selected by `config.translator`
pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>, ProviderError> {
    let provider = config.resolved_provider();
    let translator: Arc<dyn Translator> = match config.translator {
        TranslatorKind::Google => Arc::new(google::GoogleTranslator::new(
            &config.target_language,
            provider.timeout_secs,
        )?),
        TranslatorKind::OpenAI => Arc::new(openai::OpenAITranslator::new(provider)?),
        TranslatorKind::Coze => Arc::new(coze::CozeTranslator::new(provider)?),
    };
    Ok(translator)
}

/// Shared HTTP client construction for the backends
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))
}

/// Maps a non-success HTTP status to a provider error
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        code => ProviderError::ApiError {
            status_code: code,
            message,
        },
    }
}
