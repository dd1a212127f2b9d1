//! LLM provider trait and implementations.
//!
//! - `HttpLlmProvider` talks to an OpenAI-compatible chat completions
//!   endpoint via reqwest. This is the production backend.
//! - `MockLlm` replays scripted responses and counts calls, for tests.
//! - `FailingLlm` errors on every call, for failure-path tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use concierge_core::config::ProviderConfig;
use concierge_core::error::ConciergeError;
use concierge_core::types::{Message, Role};

/// Text-generation boundary.
///
/// `complete` is the free-text path (persona answers, rewrites);
/// `complete_json` is the structured path used for classification and
/// extraction steps, returning whatever JSON value the model produced.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a free-text completion for the given system instruction,
    /// prior history, and latest input.
    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        input: &str,
    ) -> Result<String, ConciergeError>;

    /// Generate a structured completion and parse it as JSON.
    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value, ConciergeError>;
}

// ---------------------------------------------------------------------------
// HttpLlmProvider - OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// reqwest-backed client for an OpenAI-compatible API.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HttpLlmProvider {
    /// Build the client from a tenant's provider section.
    pub fn new(config: &ProviderConfig) -> Result<Self, ConciergeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConciergeError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, request: &ChatCompletionRequest<'_>) -> Result<String, ConciergeError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ConciergeError::Provider(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "LLM endpoint returned an error");
            return Err(ConciergeError::Provider(format!(
                "LLM endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ConciergeError::Provider(format!("Malformed LLM response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ConciergeError::Provider("LLM response had no choices".to_string()))
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        input: &str,
    ) -> Result<String, ConciergeError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
        for msg in history {
            messages.push(WireMessage {
                role: match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &msg.content,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: input,
        });

        self.send(&ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: None,
        })
        .await
    }

    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value, ConciergeError> {
        let text = self
            .send(&ChatCompletionRequest {
                model: &self.model,
                messages: vec![WireMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.0,
                response_format: Some(ResponseFormat { kind: "json_object" }),
            })
            .await?;

        serde_json::from_str(&text)
            .map_err(|e| ConciergeError::Provider(format!("LLM returned invalid JSON: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// MockLlm - scripted responses with call counters
// ---------------------------------------------------------------------------

/// Scripted LLM for tests.
///
/// `complete` and `complete_json` each pop from their own queue; when a
/// queue runs dry the configured default is returned. Call counts are
/// exposed so tests can assert which paths were (not) taken.
#[derive(Debug, Default)]
pub struct MockLlm {
    completions: Mutex<VecDeque<String>>,
    json_replies: Mutex<VecDeque<serde_json::Value>>,
    default_completion: String,
    complete_calls: AtomicUsize,
    json_calls: AtomicUsize,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            default_completion: "OK".to_string(),
            ..Self::default()
        }
    }

    /// Queue free-text completions, returned in order.
    pub fn with_completions<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = self.completions.lock().unwrap();
            queue.extend(replies.into_iter().map(Into::into));
        }
        self
    }

    /// Queue structured replies, returned in order.
    pub fn with_json<I>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        {
            let mut queue = self.json_replies.lock().unwrap();
            queue.extend(replies);
        }
        self
    }

    /// Change the reply used when the completion queue is empty.
    pub fn with_default_completion(mut self, text: impl Into<String>) -> Self {
        self.default_completion = text.into();
        self
    }

    /// Number of `complete` calls made so far.
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Number of `complete_json` calls made so far.
    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(
        &self,
        _system: &str,
        _history: &[Message],
        _input: &str,
    ) -> Result<String, ConciergeError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self
            .completions
            .lock()
            .map_err(|e| ConciergeError::Provider(format!("mock lock poisoned: {}", e)))?;
        Ok(queue
            .pop_front()
            .unwrap_or_else(|| self.default_completion.clone()))
    }

    async fn complete_json(&self, _prompt: &str) -> Result<serde_json::Value, ConciergeError> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self
            .json_replies
            .lock()
            .map_err(|e| ConciergeError::Provider(format!("mock lock poisoned: {}", e)))?;
        Ok(queue.pop_front().unwrap_or_else(|| serde_json::json!({})))
    }
}

/// LLM that fails every call. Used to exercise error absorption.
#[derive(Debug, Clone, Default)]
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(
        &self,
        _system: &str,
        _history: &[Message],
        _input: &str,
    ) -> Result<String, ConciergeError> {
        Err(ConciergeError::Provider("simulated outage".to_string()))
    }

    async fn complete_json(&self, _prompt: &str) -> Result<serde_json::Value, ConciergeError> {
        Err(ConciergeError::Provider("simulated outage".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let llm = MockLlm::new().with_completions(["first", "second"]);
        assert_eq!(llm.complete("", &[], "x").await.unwrap(), "first");
        assert_eq!(llm.complete("", &[], "x").await.unwrap(), "second");
        // Queue exhausted: default.
        assert_eq!(llm.complete("", &[], "x").await.unwrap(), "OK");
        assert_eq!(llm.complete_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_json_queue() {
        let llm = MockLlm::new().with_json([serde_json::json!({"name": "Jane"})]);
        let value = llm.complete_json("extract").await.unwrap();
        assert_eq!(value["name"], "Jane");
        // Exhausted: empty object.
        let value = llm.complete_json("extract").await.unwrap();
        assert!(value.as_object().unwrap().is_empty());
        assert_eq!(llm.json_calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_llm() {
        let llm = FailingLlm;
        assert!(llm.complete("", &[], "x").await.is_err());
        assert!(llm.complete_json("x").await.is_err());
    }

    #[test]
    fn test_http_provider_builds_from_config() {
        let mut config = ProviderConfig::default();
        config.api_key = "sk-test".to_string();
        config.base_url = "https://api.example.com/v1/".to_string();
        let provider = HttpLlmProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }
}
