//! Generative model client (OpenAI-compatible chat completions)
//!
//! Failures carry a structured kind instead of free-form error text, so the
//! answerer can route quota exhaustion to the templated fallback without
//! sniffing substrings out of a third-party message.

use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::ResumeRagError;
use crate::errors::Result;
use crate::models::ChatMessage;
use crate::models::Role;

/// Why a generation call failed.
///
/// Quota exhaustion is an expected operating condition on a free-tier API and
/// gets a useful degraded answer; transient and fatal failures get a minimal
/// safe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmFailureKind {
    /// Rate limited or out of quota
    QuotaExceeded,
    /// Timeout, connect error, or server-side 5xx
    Transient,
    /// Auth failure, malformed request, or anything else
    Fatal,
}

#[derive(Debug, Clone)]
pub struct LlmFailure {
    pub kind: LlmFailureKind,
    pub message: String,
}

impl std::fmt::Display for LlmFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

pub struct LlmService {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl LlmService {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        })
    }

    /// Run one chat completion: system prompt plus conversation turns.
    pub async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<String, LlmFailure> {
        #[derive(Serialize)]
        struct WireMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            messages: Vec<WireMessage<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let mut wire_messages = vec![WireMessage {
            role: "system",
            content: system_prompt,
        }];
        wire_messages.extend(messages.iter().map(|m| WireMessage {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        }));

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} ({} turns)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&CompletionRequest {
                model: &self.model,
                messages: wire_messages,
                max_tokens,
                temperature,
            })
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmFailure {
                kind: classify_status(status, &body),
                message: format!("Chat API error ({status}): {body}"),
            });
        }

        let result: CompletionResponse = response.json().await.map_err(|e| LlmFailure {
            kind: LlmFailureKind::Fatal,
            message: format!("Failed to parse response: {e}"),
        })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| LlmFailure {
                kind: LlmFailureKind::Fatal,
                message: "No choices in response".to_string(),
            })
    }
}

fn classify_transport_error(e: reqwest::Error) -> LlmFailure {
    let kind = if e.is_timeout() || e.is_connect() {
        LlmFailureKind::Transient
    } else {
        LlmFailureKind::Fatal
    };
    LlmFailure {
        kind,
        message: e.to_string(),
    }
}

/// Map an HTTP error status onto a failure kind. 429 always means quota/rate;
/// some providers also report exhausted quota with a 403 body, so the body is
/// consulted only to widen that one case.
fn classify_status(status: StatusCode, body: &str) -> LlmFailureKind {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmFailureKind::QuotaExceeded;
    }
    if status.is_server_error() {
        return LlmFailureKind::Transient;
    }
    if body.contains("insufficient_quota") {
        return LlmFailureKind::QuotaExceeded;
    }
    LlmFailureKind::Fatal
}
