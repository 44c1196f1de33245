//! Google Generative AI (Gemini) via the native `generateContent` API

use super::{Backend, BackendError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const KEY_VAR: &str = "GOOGLE_API_KEY";

pub struct GoogleBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

impl GoogleBackend {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn generate_url(&self, model_id: &str) -> String {
        let model = model_id.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Backend for GoogleBackend {
    fn label(&self) -> &'static str {
        "Google"
    }

    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::MissingCredential(KEY_VAR));
        }

        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });

        let response = self
            .client
            .post(self.generate_url(model_id))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("invalid generateContent response: {e}")))?;

        let block_reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone());

        parsed.text().ok_or_else(|| match block_reason {
            Some(reason) => BackendError::Malformed(format!("prompt blocked: {reason}")),
            None => BackendError::Malformed("response contained no text".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_content_joins_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "g-key")
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]}}]}"#,
            )
            .create_async()
            .await;

        let backend = GoogleBackend::new("g-key", &server.url());
        let text = backend.complete("gemini-test", "Say hi").await.unwrap();

        assert_eq!(text, "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let backend = GoogleBackend::new("g-key", &server.url());
        let reply = backend.invoke("gemini-test", "Say hi").await;

        assert_eq!(reply.text, "Google API Error: prompt blocked: SAFETY");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let backend = GoogleBackend::new("", "http://127.0.0.1:9");
        let reply = backend.invoke("gemini-test", "Say hi").await;
        assert_eq!(reply.text, "Google API Error: GOOGLE_API_KEY is not set");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_never_raises() {
        let backend = GoogleBackend::new("g-key", "http://127.0.0.1:9");
        let reply = backend.invoke("gemini-test", "Say hi").await;
        assert!(reply.text.starts_with("Google API Error:"));
    }

    #[test]
    fn test_generate_url_strips_models_prefix() {
        let backend = GoogleBackend::new("k", "https://generativelanguage.googleapis.com/");
        assert_eq!(
            backend.generate_url("models/gemini-1.5-flash-latest"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
    }
}
