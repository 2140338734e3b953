use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::ProviderError;

/// What the prompt invoker hands to a provider: the rendered prompt and the
/// JSON schema the reply must follow.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt_name: String,
    pub prompt: String,
    pub output_schema: serde_json::Value,
}

/// A model backend able to return schema-constrained completions.
///
/// `Ok(None)` means the provider answered but produced no output.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(ProviderKind::Ollama),
            "openai" => Some(ProviderKind::OpenAI),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub ollama_url: String,
    pub openai_url: String,
    pub openai_api_key: String,
    pub timeout: Duration,
}

/// Builds the configured provider behind the trait object the invoker uses.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let client = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {}", e)))?;
    match config.kind {
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(
            client,
            &config.ollama_url,
            &config.model,
        ))),
        ProviderKind::OpenAI => {
            if config.openai_api_key.is_empty() {
                return Err(ProviderError::Configuration(
                    "OPENAI_API_KEY is not set".to_string(),
                ));
            }
            Ok(Arc::new(OpenAiProvider::new(
                client,
                &config.openai_url,
                &config.openai_api_key,
                &config.model,
            )))
        }
    }
}

// Structures matching Ollama's /api/generate endpoint
#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool, // We want the full response, not a stream
    format: &'a serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name, model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = OllamaRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            format: &request.output_schema,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Ollama API request failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ollama_response = response
            .json::<OllamaResponse>()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, e))?;

        debug!(response = ?ollama_response.response, "Received Ollama response");
        Ok(ollama_response.response)
    }
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiJsonSchema<'a> {
    name: &'a str,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Serialize)]
struct OpenAiResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: OpenAiJsonSchema<'a>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    response_format: OpenAiResponseFormat<'a>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

/// Any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name, model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        // Strict structured output rejects schemas that allow extra keys.
        let mut schema = request.output_schema.clone();
        if let Some(obj) = schema.as_object_mut() {
            obj.insert(
                "additionalProperties".to_string(),
                serde_json::Value::Bool(false),
            );
        }

        let payload = OpenAiRequest {
            model: &self.model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: OpenAiResponseFormat {
                kind: "json_schema",
                json_schema: OpenAiJsonSchema {
                    name: &request.prompt_name,
                    schema,
                    strict: true,
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "OpenAI API request failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let openai_response = response
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, e))?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);
        debug!(response = ?content, "Received OpenAI response");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("Ollama"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::parse(" openai "), Some(ProviderKind::OpenAI));
        assert_eq!(ProviderKind::parse("genkit"), None);
        assert_eq!(ProviderKind::OpenAI.as_str(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = ProviderConfig {
            kind: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            ollama_url: "http://127.0.0.1:11434".to_string(),
            openai_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: String::new(),
            timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            build_provider(&config),
            Err(ProviderError::Configuration(_))
        ));
    }
}
