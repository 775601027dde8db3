use crate::config::LlmConfig;
use crate::error::{ConfigurationError, LlmError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Anything that turns a prompt into text: a hosted API, a local model, a test stub.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        params: SamplingParams,
    ) -> Result<String, LlmError>;
}

/// Client for OpenAI-compatible chat completion endpoints (Groq, OpenAI, Ollama's `/v1`).
pub struct LLMClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
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

impl LLMClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigurationError::Client)?;

        Ok(LLMClient {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        params: SamplingParams,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_output_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let response_text = response.text().await?;
        extract_content(&response_text)
    }
}

fn classify_status(status: StatusCode, body: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(status.as_u16()),
        StatusCode::TOO_MANY_REQUESTS => LlmError::Quota,
        StatusCode::NOT_FOUND => LlmError::Unavailable(status.as_u16()),
        s if s.is_server_error() => LlmError::Unavailable(s.as_u16()),
        s => LlmError::Status {
            status: s.as_u16(),
            // Error bodies can echo the prompt back; keep only the head
            body: body.chars().take(200).collect(),
        },
    }
}

fn extract_content(raw: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(raw).map_err(|e| LlmError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello  "}}]}"#;
        assert_eq!(extract_content(raw).unwrap(), "Hello");
    }

    #[test]
    fn empty_choices_are_an_error() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(LlmError::Empty)
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::Empty)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::Auth(401)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::Quota
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            LlmError::Unavailable(503)
        ));
        match classify_status(StatusCode::BAD_REQUEST, "x".repeat(500)) {
            LlmError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
