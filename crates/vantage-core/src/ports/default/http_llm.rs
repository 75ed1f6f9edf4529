//! Default LLM port: an OpenAI-chat-completions-compatible HTTP client
//! (works against a local llama.cpp/vLLM/Ollama endpoint or a hosted
//! provider). No direct teacher precedent — the teacher never calls an
//! external LLM — grounded on the pack's general reqwest-JSON client shape.
//!
//! This is the only port with no process-local fallback: the LLM endpoint
//! is always an externally configured capability (spec §1).

use crate::error::LlmError;
use crate::ports::{JsonSchemaRequest, Llm};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpLlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

pub struct HttpLlm {
    client: reqwest::Client,
    config: HttpLlmConfig,
}

impl HttpLlm {
    pub fn new(config: HttpLlmConfig) -> Self {
        let client = reqwest::Client::builder().timeout(config.timeout).build().unwrap_or_default();
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn chat(&self, body: Value) -> Result<String, LlmError> {
        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.config.timeout)
            } else {
                LlmError::Unavailable(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(LlmError::Unavailable(format!("http {}", response.status())));
        }
        let parsed: ChatCompletion = response.json().await.map_err(|e| LlmError::MalformedJson(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedJson("no choices in completion".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Llm for HttpLlm {
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        self.chat(body).await
    }

    async fn generate_json(&self, request: JsonSchemaRequest) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {"type": "json_object"},
        });
        self.chat(body).await
    }

    async fn describe_image(&self, image_bytes: &[u8], mime_type: &str) -> Result<String, LlmError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let data_url = format!("data:{mime_type};base64,{encoded}");
        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "Transcribe and describe this document or image in plain text."},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
            "temperature": 0.0,
            "max_tokens": 2048,
        });
        self.chat(body).await
    }
}
