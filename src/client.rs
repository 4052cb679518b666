//! HTTP transport to the hosted generative-language API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::assembler::GenerateRequest;
use crate::config::Config;
use crate::error::{ConfigError, TransportError};

/// Seam between the turn controller and the remote model. The production
/// implementation is [`GeminiClient`]; tests drive the controller with stubs.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Issue one `generateContent` call and return the completion text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, TransportError>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Non-streaming Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Fails fast when no credential is configured.
    ///
    /// No request timeout is set: a stalled call blocks until the user
    /// cancels the turn.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl ModelTransport for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, TransportError> {
        debug!(
            model = %self.model,
            contents = request.contents.len(),
            "issuing generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|error| error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|_| TransportError::MalformedReply)?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(TransportError::MalformedReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_text_is_read_from_the_fixed_path() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "You need Form 6."}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);
        assert_eq!(text.as_deref(), Some("You need Form 6."));
    }

    #[test]
    fn error_message_is_read_from_the_error_envelope() {
        let body = r#"{"error": {"message": "API key not valid"}}"#;
        let parsed: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.unwrap().message, "API key not valid");
    }

    #[test]
    fn reply_without_candidates_is_malformed() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
