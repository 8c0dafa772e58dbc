//! Scripted LLM provider (testing only)
//!
//! [`ScriptedProvider`] answers from a queue of canned replies, optionally
//! routed by agent name, and records every call it receives.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

type Reply = Result<String, ProviderError>;

#[derive(Debug)]
struct Route {
    needle: String,
    reply: Reply,
}

#[derive(Debug, Clone)]
struct RecordedCall {
    messages: Vec<ChatMessage>,
    at: Instant,
}

/// Provider that replays scripted replies.
///
/// Reply selection, first match wins:
/// 1. a route whose needle occurs in the system prompt (replies repeat)
/// 2. the next reply in the queue
/// 3. the repeating fallback
///
/// With none of those available the call fails with `NotConfigured`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    routes: Vec<Route>,
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider answering every call with the same text.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(reply.into())),
            ..Default::default()
        }
    }

    /// Provider failing every call with the same error.
    pub fn repeating_error(error: ProviderError) -> Self {
        Self {
            fallback: Some(Err(error)),
            ..Default::default()
        }
    }

    /// Queue a reply.
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()))
    }

    /// Queue an error.
    pub fn then_error(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    /// Answer with `reply` whenever the system prompt contains `needle`.
    pub fn route(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply: Ok(reply.into()),
        });
        self
    }

    /// Fail with `error` whenever the system prompt contains `needle`.
    pub fn route_error(mut self, needle: impl Into<String>, error: ProviderError) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply: Err(error),
        });
        self
    }

    /// Delay every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Messages of every call, in arrival order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.messages.clone())
            .collect()
    }

    /// Arrival instants of calls whose system prompt contains `needle`.
    pub fn call_times_for(&self, needle: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| system_prompt(&c.messages).contains(needle))
            .map(|c| c.at)
            .collect()
    }

    fn push(self, reply: Reply) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Reply {
        let system = system_prompt(messages);
        if let Some(route) = self.routes.iter().find(|r| system.contains(&r.needle)) {
            return route.reply.clone();
        }

        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return reply;
        }

        self.fallback.clone().unwrap_or_else(|| {
            Err(ProviderError::NotConfigured(
                "scripted provider has no reply left".to_string(),
            ))
        })
    }
}

fn system_prompt(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.clone(),
            at: Instant::now(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let content = self.next_reply(&messages)?;
        let prompt_text: String = messages.iter().map(|m| m.content.as_str()).collect();

        Ok(CompletionResponse {
            usage: TokenUsage {
                prompt_tokens: self.estimate_tokens(&prompt_text),
                completion_tokens: self.estimate_tokens(&content),
            },
            content,
            model: "scripted".to_string(),
            stop_reason: Some("stop".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(system: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system(system), ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let provider = ScriptedProvider::repeating("fallback").then_reply("first");
        let config = CompletionConfig::default();

        let first = provider.complete(messages("s"), &config).await.unwrap();
        let second = provider.complete(messages("s"), &config).await.unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(second.content, "fallback");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_route_wins_over_queue() {
        let provider = ScriptedProvider::new()
            .then_reply("queued")
            .route_error("Market", ProviderError::AuthError);
        let config = CompletionConfig::default();

        assert!(provider
            .complete(messages("You are the Market Reality Agent."), &config)
            .await
            .is_err());
        let other = provider.complete(messages("You are someone else."), &config).await.unwrap();
        assert_eq!(other.content, "queued");
        assert_eq!(provider.call_times_for("Market").len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let provider = ScriptedProvider::new();
        let result = provider
            .complete(messages("s"), &CompletionConfig::default())
            .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
