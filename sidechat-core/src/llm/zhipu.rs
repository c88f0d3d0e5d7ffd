//! Zhipu GLM open-platform provider (OpenAI-compatible chat completions)

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};
use tokio::time::{Duration, timeout};

use super::provider::{
    ChatProvider, ChatRequest, ChatResponse, ChatStream, ChatStreamEvent, TransportError,
};
use super::sse::{DeltaDecoder, SseEvent};
use crate::config::ChatConfig;
use crate::config::constants::{defaults, urls};

/// Timeouts applied around the streamed body
#[derive(Debug, Clone)]
pub struct StreamTimeouts {
    /// Max wait for the first body chunk
    pub first_chunk: Duration,
    /// Max wait between subsequent chunks
    pub chunk: Duration,
}

impl Default for StreamTimeouts {
    fn default() -> Self {
        Self {
            first_chunk: Duration::from_secs(defaults::FIRST_CHUNK_TIMEOUT_SECS),
            chunk: Duration::from_secs(defaults::CHUNK_TIMEOUT_SECS),
        }
    }
}

pub struct ZhipuProvider {
    api_key: String,
    http_client: HttpClient,
    endpoint: String,
    timeouts: StreamTimeouts,
    request_timeout: Duration,
}

impl ZhipuProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http_client: HttpClient::new(),
            endpoint: urls::CHAT_COMPLETIONS_URL.to_string(),
            timeouts: StreamTimeouts::default(),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: StreamTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Build a provider from the chat section of the config file
    pub fn from_config(api_key: String, config: &ChatConfig) -> Self {
        Self::new(api_key)
            .with_endpoint(config.endpoint.clone())
            .with_timeouts(StreamTimeouts {
                first_chunk: Duration::from_secs(config.first_chunk_timeout_secs),
                chunk: Duration::from_secs(config.chunk_timeout_secs),
            })
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    fn build_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": request.stream,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, TransportError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for ZhipuProvider {
    fn name(&self) -> &str {
        "zhipu"
    }

    async fn generate(&self, mut request: ChatRequest) -> Result<ChatResponse, TransportError> {
        request.stream = false;
        let body = self.build_body(&request);

        let fetch = async {
            let response = self.send(&body).await?;
            response
                .json::<Value>()
                .await
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))
        };
        let payload = timeout(self.request_timeout, fetch)
            .await
            .map_err(|_| TransportError::Timeout("completion"))??;

        let message = payload
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| {
                TransportError::InvalidResponse("missing choices[0].message".to_string())
            })?;

        // Some GLM models put short answers in reasoning_content and leave
        // content empty
        let content = ["content", "reasoning_content"]
            .iter()
            .filter_map(|field| message.get(*field).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
            .to_string();

        Ok(ChatResponse { content })
    }

    async fn stream(&self, mut request: ChatRequest) -> Result<ChatStream, TransportError> {
        request.stream = true;
        let body = self.build_body(&request);
        let response = self.send(&body).await?;

        let timeouts = self.timeouts.clone();
        let stream = try_stream! {
            let mut body_stream = response.bytes_stream();
            let mut decoder = DeltaDecoder::new();
            let mut accumulated = String::new();
            let mut first = true;

            loop {
                let wait = if first { timeouts.first_chunk } else { timeouts.chunk };
                let label = if first { "first chunk" } else { "next chunk" };
                let next = timeout(wait, body_stream.next())
                    .await
                    .map_err(|_| TransportError::Timeout(label))?;
                first = false;

                let chunk = match next {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => Err(TransportError::Network(e.to_string()))?,
                    None => break,
                };

                for event in decoder.feed(&chunk) {
                    match event {
                        SseEvent::Delta(delta) => {
                            accumulated.push_str(&delta);
                            yield ChatStreamEvent::Token { delta };
                        }
                        SseEvent::Done => {}
                    }
                }
                if decoder.is_done() {
                    break;
                }
            }

            for event in decoder.finish() {
                if let SseEvent::Delta(delta) = event {
                    accumulated.push_str(&delta);
                    yield ChatStreamEvent::Token { delta };
                }
            }

            yield ChatStreamEvent::Completed {
                response: ChatResponse { content: accumulated },
            };
        };

        Ok(Box::pin(stream))
    }
}
