pub mod pagespeed;
pub mod templates;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cli::config::CompletionSettings;
use crate::error::AuditError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Client for the generative-text backend (an OpenAI-compatible
/// chat-completions endpoint).
///
/// One request per invocation, no retries: the call is already slow and
/// already paid for, so retry policy belongs to the caller. The digest is
/// truncated to a hard character cap before sending.
pub struct CompletionClient {
    client: Client,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create completion HTTP client")?;

        Ok(Self { client, settings })
    }

    /// Whether backend credentials are configured at all
    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Send the digest with the given instruction template and return the
    /// backend's text verbatim
    pub async fn complete(&self, digest: &str, template: &str) -> Result<String, AuditError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| AuditError::BackendConfig("GROQ_API_KEY is not set".to_string()))?;

        let input = truncate_chars(digest, self.settings.max_input_chars);

        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage { role: "system", content: template },
                ChatMessage { role: "user", content: input },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        debug!(
            "Sending {} digest chars to completion backend ({})",
            input.chars().count(),
            self.settings.model
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuditError::BackendFailure {
                status: None,
                message: format!("Completion request failed: {}", e),
            })?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            warn!("Completion backend rejected credentials: HTTP {}", status);
            return Err(AuditError::BackendConfig(format!(
                "Completion backend rejected credentials (HTTP {})",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            let detail = response
                .json::<ApiErrorBody>()
                .await
                .unwrap_or_default()
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());

            return Err(AuditError::BackendFailure {
                status: Some(status.as_u16()),
                message: format!("Analysis failed ({}): {}", status.as_u16(), detail),
            });
        }

        let payload: ChatResponse =
            response.json().await.map_err(|e| AuditError::BackendFailure {
                status: Some(status.as_u16()),
                message: format!("Malformed completion response: {}", e),
            })?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AuditError::BackendFailure {
                status: Some(status.as_u16()),
                message: "Completion response contained no choices".to_string(),
            })
    }
}

/// Truncate to a character count without splitting a code point
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::AuditorConfig;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> CompletionClient {
        let mut settings = AuditorConfig::default().completion;
        settings.endpoint = format!("{}/openai/v1/chat/completions", server.uri());
        settings.api_key = api_key.map(|k| k.to_string());
        CompletionClient::new(settings).unwrap()
    }

    fn completion_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        })
    }

    #[tokio::test]
    async fn test_returns_backend_text_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "llama3-70b-8192" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("The audit.")))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let result = client.complete("Title:\n- Acme\n", templates::ANALYZE_TEMPLATE).await;
        assert_eq!(result.unwrap(), "The audit.");
    }

    #[tokio::test]
    async fn test_digest_is_truncated_to_input_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(move |req: &Request| {
                let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
                let user_content = body["messages"][1]["content"].as_str().unwrap();
                assert!(user_content.chars().count() <= 12_000);
                ResponseTemplate::new(200).set_body_json(completion_body("ok"))
            })
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let oversized = "x".repeat(50_000);
        client.complete(&oversized, templates::AUDIT_TEMPLATE).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network_call() {
        let server = MockServer::start().await;
        // No mock mounted: any request would 404 and fail differently
        let client = client_for(&server, None);

        match client.complete("digest", templates::ANALYZE_TEMPLATE).await {
            Err(AuditError::BackendConfig(msg)) => assert!(msg.contains("GROQ_API_KEY")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("bad-key"));
        match client.complete("digest", templates::ANALYZE_TEMPLATE).await {
            Err(AuditError::BackendConfig(_)) => {}
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        match client.complete("digest", templates::ANALYZE_TEMPLATE).await {
            Err(AuditError::BackendFailure { status, message }) => {
                assert_eq!(status, Some(429));
                assert!(message.contains("Rate limit reached"));
            }
            other => panic!("expected backend failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_payload_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        match client.complete("digest", templates::ANALYZE_TEMPLATE).await {
            Err(AuditError::BackendFailure { message, .. }) => {
                assert!(message.contains("Malformed completion response"));
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "héllo wörld".repeat(10);
        let truncated = truncate_chars(&s, 7);
        assert_eq!(truncated.chars().count(), 7);
    }
}
