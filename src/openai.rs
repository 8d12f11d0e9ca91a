//! Minimal OpenAI client used as the game oracle.
//!
//! We only call chat.completions and ask for plain text.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key, and prompts carry the secret word, so prompt
//! text is never logged at all.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::OracleSettings;
use crate::oracle::{Oracle, OracleError};
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
  /// Client-side request timeout, taken from `[oracle] timeout_secs`.
  pub timeout: Duration,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(settings: &OracleSettings) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    Self::new(api_key, base_url, model, settings)
  }

  pub fn new(api_key: String, base_url: String, model: String, settings: &OracleSettings) -> Option<Self> {
    let timeout = settings.timeout();
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model, temperature: settings.temperature, timeout })
  }

  /// Plain-text chat completion with the whole prompt as a single user message.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn chat_plain(&self, prompt: &str) -> Result<String, OracleError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![ChatMessageReq { role: "user".into(), content: prompt.into() }],
      temperature: self.temperature,
      max_tokens: Some(64),
    };

    let started = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "yesno-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(OracleError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    info!(elapsed_ms = started.elapsed().as_millis() as u64, response_len = text.len(), "OpenAI reply");
    Ok(text)
  }
}

impl Oracle for OpenAI {
  async fn request(&self, prompt: &str, purpose: &str) -> Result<String, OracleError> {
    debug!(target: "yesno_backend", %purpose, "Oracle request");
    self.chat_plain(prompt).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_body_message_is_extracted() {
    let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Invalid API key"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn reply_content_is_read_from_first_choice() {
    let body: ChatCompletionResponse = serde_json::from_str(
      r#"{"choices":[{"message":{"content":" Yes "}}],"usage":{"total_tokens":12}}"#,
    )
    .expect("parse");
    assert_eq!(body.choices[0].message.content.as_deref(), Some(" Yes "));
    assert_eq!(body.usage.and_then(|u| u.total_tokens), Some(12));
  }

  #[test]
  fn client_timeout_follows_oracle_settings() {
    let settings = OracleSettings { timeout_secs: 45, temperature: 0.3 };
    let oa = OpenAI::new("sk-test".into(), "http://localhost:9".into(), "m".into(), &settings)
      .expect("client");
    assert_eq!(oa.timeout, Duration::from_secs(45));
    assert_eq!(oa.temperature, 0.3);

    let floor = OracleSettings { timeout_secs: 0, ..settings };
    let oa = OpenAI::new("sk-test".into(), "http://localhost:9".into(), "m".into(), &floor)
      .expect("client");
    assert_eq!(oa.timeout, Duration::from_secs(1));
  }
}
