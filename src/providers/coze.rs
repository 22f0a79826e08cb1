use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use super::{Translator, http_client, no_content, status_error};

/// Coze bot chat backend
#[derive(Debug)]
pub struct CozeTranslator {
    client: Client,
    config: ProviderConfig,
}

/// Coze chat request
#[derive(Debug, Serialize)]
pub struct CozeRequest {
    bot_id: String,
    user: String,
    query: String,
    stream: bool,
}

/// A message returned by the bot
#[derive(Debug, Deserialize)]
pub struct CozeMessage {
    #[serde(default)]
    pub role: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub content: String,
}

/// Coze chat response
#[derive(Debug, Deserialize)]
pub struct CozeResponse {
    #[serde(default)]
    pub messages: Vec<CozeMessage>,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

impl CozeResponse {
    /// Content of the answer message; falls back to the first message
    pub fn answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.message_type == "answer")
            .or_else(|| self.messages.first())
            .map(|m| m.content.trim())
            .filter(|content| !content.is_empty())
    }
}

impl CozeTranslator {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config,
        })
    }

    pub fn build_request(&self, text: &str, reference: &str) -> CozeRequest {
        CozeRequest {
            bot_id: self.config.bot_id.clone(),
            user: self.config.bot_id.clone(),
            query: self.config.render_user_prompt(text, reference),
            stream: false,
        }
    }
}

#[async_trait]
impl Translator for CozeTranslator {
    async fn translate(&self, text: &str, reference: &str) -> Result<String, ProviderError> {
        let request = self.build_request(text, reference);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "*/*")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!("Coze API error: {}", err);
            return Err(err);
        }

        let body = response
            .json::<CozeResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Coze response: {}", e)))?;

        if body.code != 0 {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Coze error {}: {}", body.code, body.msg),
            });
        }

        Ok(match body.answer() {
            Some(answer) => answer.to_string(),
            None => no_content(text),
        })
    }

    fn name(&self) -> &str {
        "coze"
    }
}
