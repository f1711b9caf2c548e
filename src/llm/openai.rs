//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    ChatMessage, ChatOptions, ChatResponse, LlmClient, LlmError, LlmErrorKind, ResponseFormat,
    TokenUsage,
};

/// Client for any endpoint speaking the `/chat/completions` protocol.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client. `request_timeout` bounds the whole HTTP exchange.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    options: &ChatOptions,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages,
        temperature: options.temperature,
        response_format: match options.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(json!({ "type": "json_object" })),
        },
    }
}

fn into_chat_response(body: CompletionResponse) -> Result<ChatResponse, LlmError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::new(LlmErrorKind::InvalidResponse, "response had no choices"))?;

    Ok(ChatResponse {
        content: choice.message.content,
        usage: body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatResponse> {
        self.chat_completion_with_options(model, messages, ChatOptions::default())
            .await
    }

    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = build_request(model, messages, &options);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Chat completion request failed");
            return Err(LlmError::from_status(status.as_u16(), body).into());
        }

        let body: CompletionResponse = response.json().await.map_err(LlmError::from)?;
        Ok(into_chat_response(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("200 tea")];
        let options = ChatOptions {
            temperature: Some(0.0),
            response_format: ResponseFormat::JsonObject,
        };
        let value =
            serde_json::to_value(build_request("gpt-4o-mini", &messages, &options)).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "200 tea");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("temperature").is_some());
    }

    #[test]
    fn test_response_parsing() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {"role": "assistant", "content": "{\"amount\": 5}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
            }"#,
        )
        .unwrap();
        let response = into_chat_response(body).unwrap();

        assert_eq!(response.content.as_deref(), Some("{\"amount\": 5}"));
        assert_eq!(response.usage.unwrap().total_tokens, 14);
    }

    #[test]
    fn test_empty_choices_is_invalid_response() {
        let body: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = into_chat_response(body).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::InvalidResponse);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            OpenAiClient::new("sk-test", "http://localhost:1234/v1/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
