use super::{Backend, BackendError};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

const KEY_VAR: &str = "OPENAI_API_KEY";

/// Any OpenAI-compatible chat completions endpoint
pub struct OpenAiBackend {
    api_key: String,
    api_base: String,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, api_base: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.to_string(),
        }
    }

    /// Create the client for the configured endpoint. The client's built-in
    /// rate-limit backoff is capped at zero elapsed time, so a 429 fails the
    /// call on the first attempt.
    fn create_client(&self) -> Result<Client<OpenAIConfig>, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::MissingCredential(KEY_VAR));
        }

        let config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.api_base);

        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(Client::with_config(config).with_backoff(backoff))
    }

    /// Build a single-user-message chat completion request
    fn build_request(
        model_id: &str,
        prompt: &str,
    ) -> Result<CreateChatCompletionRequest, BackendError> {
        let user_message: ChatCompletionRequestMessage =
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into();

        Ok(CreateChatCompletionRequestArgs::default()
            .model(model_id)
            .messages([user_message])
            .build()?)
    }

    /// Content of the first choice, empty when the model returned none
    fn extract_content(response: CreateChatCompletionResponse) -> String {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn label(&self) -> &'static str {
        "OpenAI"
    }

    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, BackendError> {
        let client = self.create_client()?;
        let request = Self::build_request(model_id, prompt)?;
        let response = client.chat().create(request).await?;

        Ok(Self::extract_content(response))
    }
}
