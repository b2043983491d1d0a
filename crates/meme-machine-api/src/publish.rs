//! Publishing the finished meme.
//!
//! Vendor social-media APIs stay out of the tree; a publisher is the seam
//! where one would plug in. The built-ins are neutral: keep the file on
//! disk, or hand it to a webhook.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Timeout for a webhook delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors delivering a finished meme.
#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {status}")]
    Status { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers a rendered meme somewhere and returns its published location.
#[async_trait]
pub trait MemePublisher: Send + Sync {
    async fn publish(&self, title: &str, jpeg_path: &Path) -> Result<String, PublishError>;
}

/// Default publisher: the meme is already on disk, report where.
pub struct DiskPublisher;

#[async_trait]
impl MemePublisher for DiskPublisher {
    async fn publish(&self, _title: &str, jpeg_path: &Path) -> Result<String, PublishError> {
        let absolute = tokio::fs::canonicalize(jpeg_path).await?;
        Ok(format!("file://{}", absolute.display()))
    }
}

/// POSTs `{title, image_b64}` to a configured URL. Returns the URL the
/// webhook reports, or the target URL when the reply carries none.
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[derive(Serialize)]
struct WebhookPost<'a> {
    title: &'a str,
    image_b64: String,
}

#[derive(Deserialize)]
struct WebhookReply {
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl MemePublisher for WebhookPublisher {
    async fn publish(&self, title: &str, jpeg_path: &Path) -> Result<String, PublishError> {
        use base64::Engine;
        let bytes = tokio::fs::read(jpeg_path).await?;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPost { title, image_b64 })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
            });
        }

        let reply: WebhookReply = response.json().await.unwrap_or(WebhookReply { url: None });
        Ok(reply.url.unwrap_or_else(|| self.url.clone()))
    }
}
