use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde_json::Value;

use crate::errors::ProviderError;
use super::{Translator, http_client, no_content, status_error};

/// Public Google Translate web endpoint
const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Google Translate backend.
///
/// The web endpoint takes no prompt and no reference, so the reference text
/// is ignored. Proxy environment variables are honoured by the HTTP client.
#[derive(Debug)]
pub struct GoogleTranslator {
    client: Client,
    target_language: String,
}

impl GoogleTranslator {
    pub fn new(target_language: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            target_language: target_language.to_string(),
        })
    }

    /// Joins the translated sentence fragments of a web endpoint reply.
    ///
    /// The reply is a nested array whose first element lists
    /// `[translated, original, ...]` fragments.
    pub fn extract_translation(body: &Value) -> Result<String, ProviderError> {
        let fragments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("Missing sentence list in Google response".to_string()))?;

        Ok(fragments
            .iter()
            .filter_map(|fragment| fragment.get(0).and_then(Value::as_str))
            .collect())
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, _reference: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(GOOGLE_TRANSLATE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target_language.as_str()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!("Google Translate error: {}", err);
            return Err(err);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google response: {}", e)))?;

        let translated = Self::extract_translation(&body)?;
        if translated.trim().is_empty() {
            return Ok(no_content(text));
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "google"
    }
}
