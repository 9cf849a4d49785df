//! AI provider contract (§6.5): a chat-completion endpoint taking
//! `{model, prompt, temperature, maxTokens}` and returning free text that
//! is expected to decode to `{"signal": <kind>, "reason": <string>}`,
//! possibly wrapped in a Markdown code fence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSignalReply {
    pub signal: String,
    pub reason: String,
}

/// A chat-completion backend. Swappable for tests via a canned-response
/// stub; the production implementation speaks whatever REST shape the
/// configured provider uses (wire framing is out of scope — only the
/// contract above is).
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// # Errors
    /// Returns an error if the completion call itself fails (network,
    /// auth, timeout). A successful call with unparseable content is not
    /// an error here — parsing happens one layer up.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Strips a leading/trailing Markdown code fence (` ```json ... ``` ` or
/// plain ` ``` `) before JSON parsing, then decodes into `AiSignalReply`.
/// Returns `None` on anything that isn't valid per §6.5 — callers treat
/// that as WAIT.
#[must_use]
pub fn parse_ai_reply(raw: &str) -> Option<AiSignalReply> {
    let stripped = strip_code_fence(raw.trim());
    serde_json::from_str(stripped).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(after_open) = text.strip_prefix("```") else {
        return text;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches('\n');
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

/// A canned-response stub for tests and for environments with no AI
/// provider configured.
pub struct StubAiProvider {
    pub response: String,
}

#[async_trait]
impl AiProvider for StubAiProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Generic REST-backed provider: posts the completion request and reads
/// back a single string field containing the model's reply text.
pub struct HttpAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpAiProvider {
    #[must_use]
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("AI provider call failed")?;
        let body: serde_json::Value = resp.json().await.context("AI provider returned non-JSON body")?;
        body["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("AI provider response missing 'content' field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let reply = parse_ai_reply(r#"{"signal": "LONG", "reason": "momentum"}"#).unwrap();
        assert_eq!(reply.signal, "LONG");
    }

    #[test]
    fn parses_fenced_json() {
        let reply = parse_ai_reply("```json\n{\"signal\": \"SHORT\", \"reason\": \"exhaustion\"}\n```").unwrap();
        assert_eq!(reply.signal, "SHORT");
    }

    #[test]
    fn garbage_input_yields_none() {
        assert!(parse_ai_reply("not json at all").is_none());
    }
}
