//! Model client adapters
//!
//! One adapter per backend, each a thin mapping onto a single vendor
//! request/response shape. Every call is a single request: no retries, no
//! streaming.

mod bedrock;
mod google;
mod ollama;
mod openai;

pub use bedrock::BedrockAnthropicBackend;
pub use google::GoogleBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use crate::config::{BackendKind, Settings};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error as StdError;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{0}")]
    Malformed(String),

    #[error(transparent)]
    OpenAi(#[from] async_openai::error::OpenAIError),
}

impl BackendError {
    /// Render the error together with its sources, so a connection failure
    /// reads as more than "error sending request".
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            let text = err.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = err.source();
        }
        message
    }
}

/// Text returned by an adapter. On failure `text` carries the error prefixed
/// with the backend label and `error` carries the bare description.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Name used to prefix error text, e.g. "Ollama"
    fn label(&self) -> &'static str;

    /// Send one prompt and return the model's text
    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, BackendError>;

    /// Like [`Backend::complete`] but never fails
    async fn invoke(&self, model_id: &str, prompt: &str) -> Reply {
        match self.complete(model_id, prompt).await {
            Ok(text) => Reply { text, error: None },
            Err(err) => {
                let detail = err.describe();
                tracing::debug!(backend = self.label(), model = model_id, error = %detail, "Backend call failed");
                Reply {
                    text: format!("{} API Error: {}", self.label(), detail),
                    error: Some(detail),
                }
            }
        }
    }
}

/// One adapter per backend kind
#[derive(Default)]
pub struct Backends {
    adapters: HashMap<BackendKind, Box<dyn Backend>>,
}

impl Backends {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::default()
            .with(
                BackendKind::OpenAi,
                OpenAiBackend::new(&settings.openai_api_key, &settings.openai_api_base),
            )
            .with(
                BackendKind::BedrockAnthropic,
                BedrockAnthropicBackend::new(&settings.bedrock_token, settings.bedrock_base_url()),
            )
            .with(
                BackendKind::Google,
                GoogleBackend::new(&settings.google_api_key, &settings.google_api_base),
            )
            .with(BackendKind::Ollama, OllamaBackend::new(&settings.ollama_api_url)?))
    }

    /// Register or replace the adapter for `kind`
    pub fn with(mut self, kind: BackendKind, backend: impl Backend + 'static) -> Self {
        self.adapters.insert(kind, Box::new(backend));
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn Backend> {
        self.adapters.get(&kind).map(|b| b.as_ref())
    }
}
