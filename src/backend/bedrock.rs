//! Anthropic models hosted on Amazon Bedrock
//!
//! Calls the runtime `InvokeModel` API with the Anthropic messages body and
//! authenticates with a Bedrock API key sent as a bearer token.

use super::{Backend, BackendError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 2048;
const TOKEN_VAR: &str = "AWS_BEARER_TOKEN_BEDROCK";
const UNPARSEABLE: &str = "could not parse response from Bedrock, check response structure";

pub struct BedrockAnthropicBackend {
    client: Client,
    token: String,
    base_url: String,
}

impl BedrockAnthropicBackend {
    pub fn new(token: &str, base_url: String) -> Self {
        Self {
            client: Client::new(),
            token: token.to_string(),
            base_url,
        }
    }

    fn invoke_url(&self, model_id: &str) -> String {
        // model ids carry a version suffix like `v1:0`
        let encoded = model_id.replace(':', "%3A");
        format!("{}/model/{}/invoke", self.base_url, encoded)
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }]
        })
    }

    fn extract_text(body: &Value) -> Option<String> {
        body.get("content")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
            .map(str::to_string)
    }
}

#[async_trait]
impl Backend for BedrockAnthropicBackend {
    fn label(&self) -> &'static str {
        "AWS Bedrock (Anthropic)"
    }

    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, BackendError> {
        if self.token.is_empty() {
            return Err(BackendError::MissingCredential(TOKEN_VAR));
        }

        let url = self.invoke_url(model_id);
        tracing::debug!(url = %url, "Bedrock request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                body: text.chars().take(500).collect(),
            });
        }

        serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(Self::extract_text)
            .ok_or_else(|| BackendError::Malformed(UNPARSEABLE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_invoke_parses_first_content_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/model/anthropic.claude-test/invoke")
            .match_header("authorization", "Bearer br-token")
            .match_body(Matcher::PartialJson(json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 2048,
                "messages": [{"role": "user", "content": [{"type": "text", "text": "Say hi"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"id": "msg_1", "content": [{"type": "text", "text": "Hello!"}], "stop_reason": "end_turn"}"#)
            .create_async()
            .await;

        let backend = BedrockAnthropicBackend::new("br-token", server.url());
        let text = backend.complete("anthropic.claude-test", "Say hi").await.unwrap();

        assert_eq!(text, "Hello!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unexpected_shape_gives_fixed_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/model/anthropic.claude-test/invoke")
            .with_status(200)
            .with_body(r#"{"content": []}"#)
            .create_async()
            .await;

        let backend = BedrockAnthropicBackend::new("br-token", server.url());
        let reply = backend.invoke("anthropic.claude-test", "Say hi").await;

        assert_eq!(
            reply.text,
            "AWS Bedrock (Anthropic) API Error: could not parse response from Bedrock, check response structure"
        );
    }

    #[tokio::test]
    async fn test_missing_token_skips_network() {
        let backend = BedrockAnthropicBackend::new("", "http://127.0.0.1:9".to_string());
        let reply = backend.invoke("anthropic.claude-test", "Say hi").await;

        assert_eq!(
            reply.error.as_deref(),
            Some("AWS_BEARER_TOKEN_BEDROCK is not set")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_never_raises() {
        let backend = BedrockAnthropicBackend::new("br-token", "http://127.0.0.1:9".to_string());
        let reply = backend.invoke("anthropic.claude-test", "Say hi").await;

        assert!(reply.text.starts_with("AWS Bedrock (Anthropic) API Error:"));
        assert!(reply.error.is_some());
    }

    #[test]
    fn test_invoke_url_encodes_version_colon() {
        let backend = BedrockAnthropicBackend::new(
            "t",
            "https://bedrock-runtime.us-east-1.amazonaws.com".to_string(),
        );
        assert_eq!(
            backend.invoke_url("anthropic.claude-3-sonnet-20240229-v1:0"),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-sonnet-20240229-v1%3A0/invoke"
        );
    }
}
