//! Chat-completion client
//!
//! Speaks the OpenAI-compatible `/chat/completions` API, either buffered or
//! as a relayed server-sent-event stream.

use crate::config::ChatConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::util::SecretString;
use axum::body::Bytes;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "chat";

/// Provider response body as a stream of chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request accepted by the chat endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Buffered completion result
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: ChatMessage,
    pub model: String,
    pub usage: Option<Usage>,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Chat provider client
pub struct ChatClient {
    http: Client,
    url: String,
    api_key: SecretString,
    model: String,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ChatClient {
    /// Create a client, or `None` if no API key is configured
    pub fn from_config(config: &ChatConfig) -> UpstreamResult<Option<Self>> {
        let Some(api_key) = config
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
        else {
            return Ok(None);
        };

        let timeout = Duration::from_secs(config.timeout_secs);

        // No total deadline on the client: a relayed stream may outlive it.
        // Connects and individual reads are bounded instead; buffered calls
        // add the total deadline per request.
        let http = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(format!("unigraph-api/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Some(Self {
            http,
            url: config.completions_url(),
            api_key: api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
        }))
    }

    fn body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> CompletionBody<'a> {
        CompletionBody {
            model: request.model.as_deref().unwrap_or(&self.model),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &CompletionBody<'_>) -> UpstreamResult<reqwest::Response> {
        let mut request = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body);
        if !body.stream {
            request = request.timeout(self.timeout);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(SERVICE, status.as_u16(), &text));
        }
        Ok(response)
    }

    /// Request a buffered completion
    #[instrument(skip_all, fields(messages = request.messages.len()))]
    pub async fn complete(&self, request: &ChatRequest) -> UpstreamResult<Completion> {
        let response = self.send(&self.body(request, false)).await?;

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::InvalidResponse {
                    service: SERVICE,
                    message: format!("Failed to parse completion: {}", e),
                })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: "completion has no choices".to_string(),
            })?;

        debug!(model = %parsed.model, "Completion received");
        Ok(Completion {
            message,
            model: parsed.model,
            usage: parsed.usage,
        })
    }

    /// Request a streamed completion and return the raw event stream
    #[instrument(skip_all, fields(messages = request.messages.len()))]
    pub async fn stream(&self, request: &ChatRequest) -> UpstreamResult<ChatStream> {
        let response = self.send(&self.body(request, true)).await?;
        Ok(Box::pin(response.bytes_stream()))
    }
}
