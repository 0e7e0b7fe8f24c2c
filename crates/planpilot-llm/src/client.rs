use planpilot_core::{RefinerConfig, TokenUsage};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;

/// A role-tagged message sent to the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System { content: String },
    User { content: String },
}

/// One synchronous chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Completion text plus the usage counters the endpoint reported.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Failure of the external text-generation call. Callers treat any of
/// these as "no change" to whatever the generation was meant to replace.
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("no API key: set {0}")]
    MissingApiKey(String),
    #[error("completion endpoint returned {status}: {detail}")]
    Http { status: u16, detail: String },
    #[error("completion transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion response missing expected fields: {0}")]
    MalformedResponse(String),
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

pub trait ChatClient {
    fn complete(&self, req: &ChatRequest) -> Result<ChatCompletion, GenerationError>;
}

/// Blocking OpenAI-compatible chat client with bounded retries.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    cfg: RefinerConfig,
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(cfg: RefinerConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(cfg.api_key_env.clone()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Self {
            cfg,
            api_key,
            client,
        })
    }

    fn build_payload(&self, req: &ChatRequest) -> Value {
        json!({
            "model": req.model,
            "messages": req.messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
            "n": 1,
        })
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, req: &ChatRequest) -> Result<ChatCompletion, GenerationError> {
        let payload = self.build_payload(req);
        let mut last_err: Option<GenerationError> = None;
        let mut attempt: u8 = 0;
        while attempt <= self.cfg.max_retries {
            let response = self
                .client
                .post(&self.cfg.endpoint)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send();

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let retry_after = parse_retry_after_seconds(resp.headers().get(RETRY_AFTER));
                    let body = resp.text()?;
                    if status.is_success() {
                        return parse_completion(&body);
                    }
                    last_err = Some(GenerationError::Http {
                        status: status.as_u16(),
                        detail: error_detail(&body),
                    });
                    if should_retry_status(status) && attempt < self.cfg.max_retries {
                        thread::sleep(retry_delay(self.cfg.retry_base_ms, attempt, retry_after));
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    break;
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect() || err.is_request();
                    last_err = Some(GenerationError::Transport(err));
                    if transient && attempt < self.cfg.max_retries {
                        thread::sleep(retry_delay(self.cfg.retry_base_ms, attempt, None));
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    break;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            GenerationError::MalformedResponse("request failed without detail".to_string())
        }))
    }
}

/// Retry only rate limiting and server-side failures; a 4xx validation
/// error will not get better on a second attempt.
fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff from `base_ms`, overridden by an explicit
/// Retry-After from the server.
fn retry_delay(base_ms: u64, attempt: u8, retry_after: Option<u64>) -> Duration {
    if let Some(secs) = retry_after {
        return Duration::from_secs(secs);
    }
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(6)))
}

fn parse_retry_after_seconds(value: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    value?.to_str().ok()?.trim().parse().ok()
}

/// Best-effort extraction of the API's error message; falls back to a
/// truncated raw body.
fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    body.chars().take(200).collect()
}

fn parse_completion(body: &str) -> Result<ChatCompletion, GenerationError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
    let text = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("choices[0].message.content absent".to_string())
        })?
        .trim()
        .to_string();
    if text.is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    let usage = TokenUsage {
        prompt_tokens: value
            .pointer("/usage/prompt_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        completion_tokens: value
            .pointer("/usage/completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    };
    Ok(ChatCompletion { text, usage })
}
