use super::{Backend, BackendError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Local Ollama `/api/generate` endpoint
pub struct OllamaBackend {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

impl OllamaBackend {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Ollama HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn label(&self) -> &'static str {
        "Ollama"
    }

    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, BackendError> {
        let payload = GenerateRequest {
            model: model_id,
            prompt,
            stream: false,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| BackendError::Malformed("Malformed JSON response from Ollama.".to_string()))?;

        match body.get("response").and_then(Value::as_str) {
            Some(text) => Ok(text.to_string()),
            None => Err(BackendError::Malformed(
                "'response' key not found in Ollama output.".to_string(),
            )),
        }
    }
}
