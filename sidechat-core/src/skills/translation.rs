//! Translation skill backing the `translate` trigger action
//!
//! Thin client for the translation endpoint: `GET ?text=..&key=..` answered
//! by `{code, data}` where `data` is the translated text.

use reqwest::Client as HttpClient;
use serde::Deserialize;
use thiserror::Error;

use crate::config::TranslationConfig;
use crate::config::constants::urls;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation network error: {0}")]
    Network(String),
    #[error("translation endpoint error: {0}")]
    Endpoint(String),
    #[error("translation requires an endpoint key")]
    MissingKey,
}

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    code: i64,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

pub struct TranslationClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
}

impl TranslationClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: urls::TRANSLATION_API_URL.to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Translate Chinese text to English
    pub async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let key = self.api_key.as_deref().ok_or(TranslationError::MissingKey)?;

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("text", text), ("key", key)])
            .send()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        let payload: TranslationResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Endpoint(e.to_string()))?;

        if payload.code == 200 {
            payload
                .data
                .ok_or_else(|| TranslationError::Endpoint("empty data field".to_string()))
        } else {
            Err(TranslationError::Endpoint(
                payload.msg.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
