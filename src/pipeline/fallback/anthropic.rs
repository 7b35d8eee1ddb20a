use serde::{Deserialize, Serialize};

use super::generator::{FallbackGenerator, Generation};
use super::usage::TokenUsage;
use super::GeneratorError;
use crate::config::ExtractorConfig;

/// Messages API version header value.
const API_VERSION: &str = "2023-06-01";

/// Blocking HTTP client for a hosted Messages-style completion API.
///
/// Holds settings only. The `reqwest::blocking::Client` is built and dropped
/// inside `generate`, on the calling thread, so the extractor owning this
/// value can be created and dropped inside an async runtime.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_tokens: u32, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            timeout_secs,
        }
    }

    /// Build from configuration. Fails when no API key is configured.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, GeneratorError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GeneratorError::MissingApiKey)?;
        Ok(Self::new(
            &config.api_base_url,
            api_key,
            &config.model,
            config.max_tokens,
            config.timeout_secs,
        ))
    }

    fn http_client(&self) -> Result<reqwest::blocking::Client, GeneratorError> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| GeneratorError::HttpClient(e.to_string()))
    }
}

/// Request body for /v1/messages
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body from /v1/messages
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: ResponseUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// First text block of a response.
fn first_text_block(response: MessagesResponse) -> Result<Generation, GeneratorError> {
    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or(GeneratorError::EmptyCompletion)?;

    Ok(Generation {
        content: text,
        token_usage: TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
    })
}

impl FallbackGenerator for AnthropicClient {
    fn generate(&self, system: &str, user: &str) -> Result<Generation, GeneratorError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [RequestMessage {
                role: "user",
                content: user,
            }],
        };

        let client = self.http_client()?;
        let response = client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GeneratorError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout_secs)
                } else {
                    GeneratorError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GeneratorError::RateLimited);
        }
        if status.as_u16() == 408 {
            return Err(GeneratorError::Timeout(self.timeout_secs));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| GeneratorError::ResponseParsing(e.to_string()))?;

        first_text_block(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
