//! Groq provider over the OpenAI-compatible chat completions API.
//!
//! Any backend that speaks the same `/chat/completions` dialect can be used
//! by pointing `base_url` at it.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable name for the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq chat completions provider.
///
/// The API key is held as an [`ApiCredential`] and exposed only when the
/// `Authorization` header is built.
pub struct GroqProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(api_key, CredentialSource::Programmatic))
    }

    /// Create from JSON configuration, falling back to `GROQ_API_KEY`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential =
            ApiCredential::resolve(config, "api_key", GROQ_API_KEY_ENV).ok_or_else(missing_key)?;

        let provider = Self::with_credential(credential);
        Ok(match config["base_url"].as_str() {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> ChatRequest {
        ChatRequest {
            model: config.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| RequestMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: config.json_mode.then(|| ResponseFormat {
                type_: "json_object".to_string(),
            }),
        }
    }
}

/// OpenAI-compatible request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<RequestMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: String,
}

/// OpenAI-compatible response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = Self::build_request(messages, config);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::HttpError(e.to_string()))?;
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);

            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let (content, stop_reason) = match body.choices.into_iter().next() {
            Some(choice) => (choice.message.content.unwrap_or_default(), choice.finish_reason),
            None => (String::new(), None),
        };

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model,
            stop_reason,
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "groq"
    }
}

/// Factory for creating Groq providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "gsk_...",                          // Optional, falls back to GROQ_API_KEY
///   "base_url": "https://api.groq.com/openai/v1"   // Optional
/// }
/// ```
pub struct GroqProviderFactory;

impl ProviderFactory for GroqProviderFactory {
    fn provider_type(&self) -> &'static str {
        "groq"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;
        Ok(Arc::new(GroqProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if ApiCredential::resolve(config, "api_key", GROQ_API_KEY_ENV).is_none() {
            return Err(missing_key());
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn missing_key() -> ProviderError {
    ProviderError::NotConfigured(format!(
        "Groq API key required: set 'api_key' in config or {} env",
        GROQ_API_KEY_ENV
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        assert_eq!(GroqProvider::new("test-key").name(), "groq");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "gsk_super_secret_key_12345";
        let provider = GroqProvider::new(secret_key);

        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains(secret_key));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_reflects_key() {
        assert!(GroqProvider::new("key").health_check().await);
        assert!(!GroqProvider::new("").health_check().await);
    }

    #[test]
    fn test_request_uses_json_mode() {
        let config = CompletionConfig::default();
        let request = GroqProvider::build_request(
            vec![ChatMessage::system("sys"), ChatMessage::user("usr")],
            &config,
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_request_without_json_mode_omits_format() {
        let config = CompletionConfig {
            json_mode: false,
            ..Default::default()
        };
        let request = GroqProvider::build_request(vec![ChatMessage::user("hi")], &config);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_from_config_sets_base_url() {
        let config = serde_json::json!({
            "api_key": "config-api-key",
            "base_url": "https://gateway.internal/v1/"
        });

        let provider = GroqProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://gateway.internal/v1");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_factory_rejects_invalid_base_url() {
        let config = serde_json::json!({
            "api_key": "test-key",
            "base_url": "gateway.internal"
        });
        assert!(GroqProviderFactory.validate_config(&config).is_err());
    }

    #[test]
    fn test_factory_rejects_blank_api_key() {
        std::env::remove_var(GROQ_API_KEY_ENV);
        match GroqProviderFactory.create(&serde_json::json!({ "api_key": "  " })) {
            Err(ProviderError::NotConfigured(msg)) => assert!(msg.contains(GROQ_API_KEY_ENV)),
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_factory_create_with_api_key() {
        let provider = GroqProviderFactory
            .create(&serde_json::json!({ "api_key": "k" }))
            .unwrap();
        assert_eq!(provider.name(), "groq");
        assert_eq!(GroqProviderFactory.provider_type(), "groq");
    }
}
