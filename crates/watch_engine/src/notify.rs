use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;
use watch_core::NotificationMessage;
use watch_logging::{watch_error, watch_info, watch_warn};

const MAX_LOGGED_BODY: usize = 300;

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    /// Pause after each failed attempt; its length is the attempt budget.
    pub backoffs: Vec<Duration>,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            request_timeout: Duration::from_secs(20),
            backoffs: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
            ],
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// True when the endpoint acknowledged delivery. Never fails; problems
    /// are logged so the detection pipeline is not disturbed.
    async fn send(&self, message: &NotificationMessage) -> bool;
}

#[derive(Debug, Error)]
enum NotifyError {
    #[error("telegram is not configured: set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID")]
    NotConfigured,
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rejected with http {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    #[serde(default)]
    ok: bool,
}

/// Delivers alerts through the Telegram Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    settings: TelegramSettings,
}

impl TelegramNotifier {
    pub fn new(settings: TelegramSettings) -> Self {
        Self { settings }
    }

    fn credentials(&self) -> Result<(&str, &str), NotifyError> {
        let token = self.settings.token.as_deref().filter(|t| !t.is_empty());
        let chat_id = self.settings.chat_id.as_deref().filter(|c| !c.is_empty());
        match (token, chat_id) {
            (Some(token), Some(chat_id)) => Ok((token, chat_id)),
            _ => Err(NotifyError::NotConfigured),
        }
    }

    fn endpoint(&self, token: &str) -> Result<Url, NotifyError> {
        let raw = format!(
            "{}/bot{}/sendMessage",
            self.settings.api_base.trim_end_matches('/'),
            token
        );
        Url::parse(&raw).map_err(|err| NotifyError::Endpoint(err.to_string()))
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        endpoint: &Url,
        payload: &str,
    ) -> Result<(), NotifyError> {
        let response = client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|err| NotifyError::Network(err.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| NotifyError::Network(err.without_url().to_string()))?;

        let acknowledged = status == StatusCode::OK
            && serde_json::from_slice::<TelegramReply>(&body)
                .map(|reply| reply.ok)
                .unwrap_or(false);
        if acknowledged {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body)
                    .chars()
                    .take(MAX_LOGGED_BODY)
                    .collect(),
            })
        }
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<u32, NotifyError> {
        let (token, chat_id) = self.credentials()?;
        let endpoint = self.endpoint(token)?;
        let client = reqwest::Client::builder()
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| NotifyError::Network(err.to_string()))?;

        let payload = json!({
            "chat_id": chat_id,
            "text": message.render(),
            "disable_web_page_preview": false,
            "parse_mode": "HTML",
        })
        .to_string();

        let budget = self.settings.backoffs.len().max(1) as u32;
        let mut last_error = NotifyError::Network("no attempt was made".to_string());
        for attempt in 1..=budget {
            match self.attempt(&client, &endpoint, &payload).await {
                Ok(()) => return Ok(attempt),
                Err(err) => {
                    watch_warn!("Notification attempt {}/{} failed: {}", attempt, budget, err);
                    last_error = err;
                }
            }
            if attempt < budget {
                if let Some(pause) = self.settings.backoffs.get(attempt as usize - 1) {
                    tokio::time::sleep(*pause).await;
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &NotificationMessage) -> bool {
        match self.deliver(message).await {
            Ok(attempts) => {
                watch_info!(
                    "Notification for version {} delivered (attempt {})",
                    message.version_id,
                    attempts
                );
                true
            }
            Err(NotifyError::NotConfigured) => {
                watch_error!("{}", NotifyError::NotConfigured);
                false
            }
            Err(err) => {
                watch_error!(
                    "Notification for version {} failed: {}",
                    message.version_id,
                    err
                );
                false
            }
        }
    }
}
