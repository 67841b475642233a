use async_trait::async_trait;
use recap_core::ConversationMessage;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack api transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack api `{method}` returned error: {reason}")]
    Platform { method: &'static str, reason: String },
    #[error("slack api `{method}` response missing `{field}`")]
    MissingField { method: &'static str, field: &'static str },
}

/// Web API surface the command path needs. History reads and channel posts go
/// through this trait so the digest service can be tested with a fake.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_history(&self, channel_id: &str)
        -> Result<Vec<ConversationMessage>, ApiError>;
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ApiError>;
}

/// HTTPS client for Slack's Web API. The app-level token opens Socket Mode
/// connections; the bot token covers everything else.
#[derive(Clone)]
pub struct SlackWebApi {
    http: reqwest::Client,
    base_url: String,
    app_token: SecretString,
    bot_token: SecretString,
}

impl SlackWebApi {
    pub fn new(app_token: SecretString, bot_token: SecretString) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url: SLACK_API_BASE.to_string(), app_token, bot_token })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }

    /// Requests a fresh Socket Mode websocket URL. Each URL is single-use;
    /// the transport calls this again on every reconnect.
    pub async fn connections_open(&self) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.endpoint("apps.connections.open"))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await?
            .json::<ConnectionsOpenResponse>()
            .await?;

        ensure_ok("apps.connections.open", response.ok, response.error)?;
        response
            .url
            .ok_or(ApiError::MissingField { method: "apps.connections.open", field: "url" })
    }
}

#[async_trait]
impl ChatApi for SlackWebApi {
    async fn fetch_history(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ConversationMessage>, ApiError> {
        // Platform default page only; no cursor or limit parameters.
        let response = self
            .http
            .get(self.endpoint("conversations.history"))
            .query(&[("channel", channel_id)])
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await?
            .json::<HistoryResponse>()
            .await?;

        ensure_ok("conversations.history", response.ok, response.error)?;
        Ok(map_history(response.messages.unwrap_or_default()))
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&serde_json::json!({ "channel": channel_id, "text": text }))
            .send()
            .await?
            .json::<PostMessageResponse>()
            .await?;

        ensure_ok("chat.postMessage", response.ok, response.error)
    }
}

fn ensure_ok(method: &'static str, ok: bool, error: Option<String>) -> Result<(), ApiError> {
    if ok {
        return Ok(());
    }

    Err(ApiError::Platform {
        method,
        reason: error.unwrap_or_else(|| "unknown_error".to_string()),
    })
}

// Order is preserved as delivered; Slack returns newest first.
fn map_history(messages: Vec<HistoryMessage>) -> Vec<ConversationMessage> {
    messages
        .into_iter()
        .map(|message| ConversationMessage {
            author: message.user,
            text: message.text.unwrap_or_default(),
            ts: message.ts.unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    messages: Option<Vec<HistoryMessage>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    user: Option<String>,
    text: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}
