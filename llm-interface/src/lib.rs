use echopost_core::{CoreError, LlmError, OpenRouterConfig};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "openrouter";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client against an OpenRouter-compatible endpoint.
#[derive(Debug)]
pub struct OpenRouterClient {
    http_client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, CoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "HTTP-Referer",
            HeaderValue::from_static("https://github.com/echopost/echopost"),
        );
        headers.insert("X-Title", HeaderValue::from_static("echopost"));

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Request one completion for a system instruction plus user prompt,
    /// returning the first choice's text trimmed of surrounding whitespace.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CoreError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("Requesting completion from {}", self.config.model);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Completion request failed with status {}", status);
            return Err(CoreError::Llm(match status.as_u16() {
                401 | 403 => LlmError::InvalidApiKey {
                    provider: PROVIDER.to_string(),
                },
                429 => LlmError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                    retry_after: 60,
                },
                _ if status.is_server_error() => LlmError::ServiceUnavailable {
                    provider: PROVIDER.to_string(),
                },
                _ => LlmError::InvalidResponseFormat {
                    provider: PROVIDER.to_string(),
                },
            }));
        }

        let completion: ChatResponse = response.json().await.map_err(|_| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            })
        })?;

        extract_text(completion).ok_or_else(|| {
            CoreError::Llm(LlmError::NoCompletion {
                model: self.config.model.clone(),
            })
        })
    }
}

/// First non-empty completion text, trimmed. An empty choice list or a
/// blank completion yields `None`.
fn extract_text(completion: ChatResponse) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
