//! HTTP language-model client for OpenAI-compatible chat-completions APIs.
//!
//! A dumb transport: one prompt in, the first choice's text out.

use std::time::Duration;

use async_trait::async_trait;
use hiring_pipeline::{LanguageModel, ModelError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmEndpoint;

const SYSTEM_PROMPT: &str =
    "You are a specialized AI agent for hiring analysis. Provide clear, structured responses.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct HttpLanguageModel {
    endpoint: LlmEndpoint,
    http: reqwest::Client,
}

impl HttpLanguageModel {
    pub fn new(endpoint: LlmEndpoint) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn query(&self, prompt: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.endpoint.max_tokens,
            temperature: self.endpoint.temperature,
        };

        let mut builder = self.http.post(&self.endpoint.url).json(&request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ModelError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::ParseError(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyCompletion)?;

        debug!(model = %self.endpoint.model, chars = content.len(), "Completion received");
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.endpoint.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "asi1-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            max_tokens: 800,
            temperature: 0.3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "asi1-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 800);
    }

    #[test]
    fn test_response_without_content() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        let model = HttpLanguageModel::new(LlmEndpoint {
            url: "http://127.0.0.1:9/v1/chat/completions".into(),
            api_key: None,
            model: "test".into(),
            timeout_secs: 2,
            temperature: 0.3,
            max_tokens: 10,
        })
        .unwrap();
        assert!(matches!(
            model.query("hello").await,
            Err(ModelError::RequestFailed(_))
        ));
    }
}
