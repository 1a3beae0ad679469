//! Proxy to an OpenRouter-compatible chat-completions endpoint.
//!
//! The proxy always produces an assistant reply. Upstream failures are logged
//! and answered with a canned fallback message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemini-pro-1.5";
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "\
You are \"Jendo Health Assistant\", the official assistant of Jendo.

Jendo is an AI-powered, non-invasive cardiovascular health technology that detects \
vascular dysfunction early, before symptoms appear. It combines photoplethysmography \
(blood flow patterns), digital thermal monitoring (vascular reactivity and endothelial \
function) and AI analytics to produce a Vascular Health Score. The Jendo Health Test \
takes about 15 minutes lying down, uses a brief pressure cuff occlusion, and involves \
no needles and no radiation. The technology is patented in Japan, Sri Lanka and the USA.

Your goals: educate users about cardiovascular health and early detection, explain \
Jendo and the Jendo Health Test, answer general health questions safely, and \
encourage preventive care and professional consultation.

Safety rules:
- Never diagnose conditions or prescribe medication or treatment.
- Never present yourself as a replacement for a doctor.
- State \"This is not a medical diagnosis.\" when discussing symptoms.
- For serious or emergency symptoms, advise immediate medical attention.

Style: friendly, professional, simple English, short answers, bullet points when helpful.
End answers about health topics with: \"Jendo supports early detection and preventive \
care but does not replace professional medical advice.\"";

const NOT_CONFIGURED_MESSAGE: &str = "Chat service is not configured. Please contact support.";

const FALLBACK_MESSAGE: &str = "\
I'm sorry, I'm unable to assist with that specific question at the moment.

For more detailed information about Jendo and our cardiovascular health technology, \
please visit our website or contact us directly:

**Website:** https://www.jendo.health/

**Jendo Incorporation (USA)**
- Address: 251, Little Falls Drive, Wilmington, New Castle County, Delaware
- Email: info@jendoinnovations.com
- Phone: 0766210120

**AI Health R&D Centre**
- Address: Bay X, Trace Expert City
- Email: info@jendoinnovations.com
- Phone: 0766210120

Our team will be happy to help with any questions about Jendo technology, the Jendo \
Health Test, or cardiovascular health monitoring.";

/// Chatbot upstream configuration.
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    /// API key; without one every request gets the "not configured" reply
    pub api_key: Option<String>,
    pub endpoint: Url,
    pub model: String,
    pub timeout: Duration,
}

impl ChatbotConfig {
    pub fn new(api_key: Option<String>, endpoint: Url, model: String) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint,
            model,
            timeout: UPSTREAM_TIMEOUT,
        }
    }

    /// Configuration without an API key, pointing at the default endpoint.
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            model: DEFAULT_MODEL.to_string(),
            timeout: UPSTREAM_TIMEOUT,
        }
    }
}

/// A previous turn in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryItem {
    pub role: String,
    pub content: String,
}

/// Reply returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatReply {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

impl ChatReply {
    fn assistant(content: impl Into<String>) -> Self {
        Self::with_prefix("assistant", content)
    }

    fn error(content: impl Into<String>) -> Self {
        Self::with_prefix("error", content)
    }

    fn with_prefix(prefix: &str, content: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", prefix, Uuid::new_v4()),
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn fallback() -> Self {
        Self::assistant(FALLBACK_MESSAGE)
    }
}

#[derive(Clone)]
pub struct Chatbot {
    http: reqwest::Client,
    config: ChatbotConfig,
}

impl Chatbot {
    pub fn new(config: ChatbotConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Forward the conversation upstream and return the assistant reply.
    pub async fn reply(&self, message: &str, history: &[HistoryItem]) -> ChatReply {
        let Some(api_key) = self.config.api_key.as_deref() else {
            error!("Chatbot API key not configured");
            return ChatReply::error(NOT_CONFIGURED_MESSAGE);
        };

        let body = build_request(&self.config.model, message, history);
        debug!(model = %self.config.model, turns = history.len(), "Sending chat request");

        let response = match self
            .http
            .post(self.config.endpoint.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Chat upstream request failed");
                return ChatReply::fallback();
            }
        };

        let status = response.status();
        info!(status = status.as_u16(), "Chat upstream responded");

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to read chat upstream body");
                return ChatReply::fallback();
            }
        };

        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), body = %text, "Chat upstream error");
            return ChatReply::fallback();
        }

        let parsed: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "Chat upstream returned invalid JSON");
                return ChatReply::fallback();
            }
        };

        match extract_reply(&parsed) {
            Ok(content) => ChatReply::assistant(content),
            Err(reason) => {
                warn!(reason = %reason, "No usable chat reply");
                ChatReply::fallback()
            }
        }
    }
}

/// Build the chat-completions request body.
pub fn build_request(model: &str, message: &str, history: &[HistoryItem]) -> Value {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(json!({ "role": "system", "content": SYSTEM_PROMPT }));
    for item in history {
        messages.push(json!({ "role": item.role, "content": item.content }));
    }
    messages.push(json!({ "role": "user", "content": message }));

    json!({
        "model": model,
        "messages": messages,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
    })
}

/// Pull the first choice's message content out of a response body.
pub fn extract_reply(body: &Value) -> Result<String, String> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(format!("upstream error: {}", message));
    }

    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| "missing or empty content".to_string())
}
