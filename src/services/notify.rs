use crate::config::{NotifierKind, NotifyConfig};
use crate::error::NotifyError;
use crate::types::Owner;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

/// Outbound message delivery to a request's owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: &Owner, text: &str) -> Result<(), NotifyError>;
}

/// Build the notifier named by the configuration.
pub fn from_config(cfg: &NotifyConfig) -> Result<Box<dyn Notifier>, NotifyError> {
    let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
    match cfg.kind {
        NotifierKind::Log => Ok(Box::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = cfg.url.clone().ok_or_else(|| {
                NotifyError::InvalidConfiguration("webhook notifier needs notify.url".into())
            })?;
            Ok(Box::new(WebhookNotifier::new(url, timeout)?))
        }
        NotifierKind::Line => {
            let token = cfg.token.clone().ok_or_else(|| {
                NotifyError::InvalidConfiguration("line notifier needs notify.token".into())
            })?;
            let mut line = LineNotifier::new(token, timeout)?;
            if let Some(url) = &cfg.url {
                line = line.with_endpoint(url.clone());
            }
            Ok(Box::new(line))
        }
    }
}

fn http_client(timeout: Duration) -> Result<Client, NotifyError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

async fn ensure_success(response: reqwest::Response, service: &str) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    Err(NotifyError::SendFailed(format!(
        "{service} returned {status}: {body}"
    )))
}

/// Prints the message and records it in the tracing log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, owner: &Owner, text: &str) -> Result<(), NotifyError> {
        tracing::info!(owner = %owner, "notification");
        println!("[{owner}] {text}");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    owner: &'a str,
    text: &'a str,
}

/// POSTs `{ "owner": …, "text": … }` to a fixed URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, owner: &Owner, text: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            owner: &owner.0,
            text,
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;
        ensure_success(response, "webhook").await
    }
}

#[derive(Serialize)]
struct LineMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct LinePush<'a> {
    to: &'a str,
    messages: [LineMessage<'a>; 1],
}

/// LINE Messaging API push message.
pub struct LineNotifier {
    client: Client,
    token: String,
    endpoint: String,
}

impl LineNotifier {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(NotifyError::InvalidConfiguration(
                "empty LINE channel token".into(),
            ));
        }
        Ok(Self {
            client: http_client(timeout)?,
            token,
            endpoint: LINE_PUSH_URL.to_string(),
        })
    }

    /// Point at a different push endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn notify(&self, owner: &Owner, text: &str) -> Result<(), NotifyError> {
        let payload = LinePush {
            to: &owner.0,
            messages: [LineMessage { kind: "text", text }],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        ensure_success(response, "LINE push API").await
    }
}
