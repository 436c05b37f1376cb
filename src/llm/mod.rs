//! Blocking client for Groq's OpenAI-compatible chat-completions API.

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod prompt;

/// Environment variable holding the API credential. Never read from the
/// config file.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Default chat endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Tunables for the chat call.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

/// Chat-completions client. One blocking request per call.
pub struct GroqClient {
    settings: LlmSettings,
    api_key: String,
    http: HttpClient,
}

impl GroqClient {
    /// Build a client, reading the credential from `GROQ_API_KEY`.
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("{API_KEY_VAR} environment variable is not set"))?;
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(settings: LlmSettings, api_key: String) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(GroqClient {
            settings,
            api_key,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Send one prompt and return the raw completion text.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.settings.base_url);
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("Failed to reach {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Chat completion failed ({status}): {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .context("Failed to parse chat completion response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion returned no choices"))
    }

    /// Translate an English question into SQL: build the prompt, complete,
    /// strip fences. The result is not validated as SQL.
    pub fn text_to_sql(&self, question: &str, schema_summary: &str) -> Result<String> {
        let raw = self.complete(&prompt::build(question, schema_summary))?;
        Ok(prompt::clean_sql(&raw))
    }
}

/// Chat-completions URL for a base, tolerating a trailing slash.
fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        assert_eq!(
            endpoint("https://api.groq.com/openai/v1"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            endpoint("https://api.groq.com/openai/v1/"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "llama3-8b-8192",
            messages: vec![ChatMessage {
                role: "user",
                content: "how many students?",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-8b-8192");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "how many students?");
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "SELECT 1"}}
            ],
            "usage": {"total_tokens": 10}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "SELECT 1");
    }

    #[test]
    fn test_client_keeps_model_override() {
        let settings = LlmSettings {
            model: "llama-3.1-70b-versatile".to_string(),
            ..LlmSettings::default()
        };
        let client = GroqClient::with_api_key(settings, "k".to_string()).unwrap();
        assert_eq!(client.model(), "llama-3.1-70b-versatile");
    }
}
