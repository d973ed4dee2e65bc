//! OpenAI-compatible chat completion client
//!
//! Groq and OpenAI expose the same `/chat/completions` shape, so one client
//! serves both; only the endpoint, key and model differ.
//!
//! All callers ask for `response_format: json_object` and read the dishes
//! array back with [`parse_dish_payload`].

use crate::types::{with_cancel, ProviderError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default OpenAI model for text and vision calls
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default Groq model for text parsing and enrichment
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Per-request timeout; the pipeline itself imposes none
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const TEMPERATURE: f64 = 0.2;

/// Chat completion client bound to one backend
#[derive(Debug, Clone)]
pub struct ChatClient {
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    label: &'static str,
}

impl ChatClient {
    /// Client for the OpenAI API
    pub fn openai(api_key: Option<String>) -> Self {
        Self::new("openai", OPENAI_URL, api_key, OPENAI_MODEL)
    }

    /// Client for the Groq API
    pub fn groq(api_key: Option<String>) -> Self {
        Self::new("groq", GROQ_URL, api_key, GROQ_MODEL)
    }

    pub fn new(
        label: &'static str,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one chat completion and return the message content
    ///
    /// # Errors
    /// - `NotConfigured` without an API key
    /// - `Network` on transport failure
    /// - `Api` on a non-success status
    /// - `Parse` when the response has no message content
    /// - `Cancelled` once `cancel` fires
    pub async fn complete_json(
        &self,
        messages: Vec<Value>,
        max_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} API key", self.label)))?;

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
        });

        let started = Instant::now();
        with_cancel(cancel, async {
            let response = self
                .http_client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Network(format!("{} request failed: {}", self.label, e)))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!(
                    backend = self.label,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chat completion failed"
                );
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: truncate(&text, 300),
                });
            }

            let completion: ChatCompletion = response.json().await.map_err(|e| {
                ProviderError::Parse(format!("{} response was not a completion: {}", self.label, e))
            })?;

            let choice = completion
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::Parse(format!("{} returned no choices", self.label)))?;
            let content = choice.message.content.unwrap_or_default();

            debug!(
                backend = self.label,
                model = %self.model,
                finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
                content_len = content.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Chat completion OK"
            );

            Ok(content)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// System + user message pair
pub fn text_messages(system: &str, user: &str) -> Vec<Value> {
    vec![
        json!({ "role": "system", "content": system }),
        json!({ "role": "user", "content": user }),
    ]
}

/// Read the dishes array out of model output
///
/// Accepts `{"dishes": [...]}` or a bare array. When the content is not
/// valid JSON as a whole, the outermost `[...]` slice is tried instead.
/// Elements that fail to deserialize are skipped.
///
/// # Errors
/// `Parse` when no array can be recovered at all.
pub fn parse_dish_payload<T: DeserializeOwned>(content: &str) -> Result<Vec<T>, ProviderError> {
    let items = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(mut map)) => match map.remove("dishes") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(ProviderError::Parse(format!(
                    "`dishes` is not an array: {}",
                    truncate(&other.to_string(), 80)
                )))
            }
        },
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            return Err(ProviderError::Parse(format!(
                "Unexpected payload: {}",
                truncate(&other.to_string(), 80)
            )))
        }
        Err(_) => recover_array(content)?,
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Skipping malformed dish entry");
                None
            }
        })
        .collect();

    if parsed.len() < total {
        warn!(kept = parsed.len(), total, "Dropped malformed dish entries");
    }

    Ok(parsed)
}

fn recover_array(content: &str) -> Result<Vec<Value>, ProviderError> {
    let start = content.find('[');
    let end = content.rfind(']');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Vec<Value>>(&content[start..=end])
                .map_err(|e| ProviderError::Parse(format!("Failed to parse menu data: {}", e)))
        }
        _ => Err(ProviderError::Parse("Failed to parse menu data".to_string())),
    }
}

/// Clip long upstream error bodies for logs and error messages
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
