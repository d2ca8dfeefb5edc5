use std::collections::HashMap;

use reqwest::{Client, StatusCode};

pub type SdkResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const X_REPLY_ID: &str = "x-replyid";
const X_IN_REPLY_TO: &str = "x-inreplyto";
const X_WH_FROM: &str = "x-whfrom";
const X_WH_DELAY_SECS: &str = "x-whdelaysecs";
const FORWARDED_HEADER_PREFIX: &str = "x-whheader-";

/// A webhook call handed out by the proxy.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Correlation id to answer with.
    pub id: String,
    /// Original webhook headers, lowercase names, prefix stripped.
    pub headers: HashMap<String, String>,
    pub content_type: Option<String>,
    /// Address of the webhook caller.
    pub origin: Option<String>,
    /// Seconds the call waited in the proxy before pickup.
    pub delay_secs: Option<f64>,
    pub body: Vec<u8>,
}

pub struct PollClient {
    client: Client,
    poll_url: String,
    reply_url: String,
}

impl PollClient {
    pub fn new(poll_url: &str, reply_url: &str) -> Self {
        Self {
            client: Client::new(),
            poll_url: poll_url.to_string(),
            reply_url: reply_url.to_string(),
        }
    }

    /// Long-poll once. `None` when the proxy had nothing within its wait.
    pub async fn poll(&self) -> SdkResult<Option<Delivery>> {
        let resp = self.client.get(&self.poll_url).send().await?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Proxy returned error status {}: {}", status, text).into());
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let id = header(X_REPLY_ID).ok_or("Delivery without X-ReplyId header")?;
        let content_type = header(reqwest::header::CONTENT_TYPE.as_str());
        let origin = header(X_WH_FROM);
        let delay_secs = header(X_WH_DELAY_SECS).and_then(|v| v.parse().ok());

        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let original = name.as_str().strip_prefix(FORWARDED_HEADER_PREFIX)?;
                Some((original.to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();

        let body = resp.bytes().await?.to_vec();

        Ok(Some(Delivery {
            id,
            headers,
            content_type,
            origin,
            delay_secs,
            body,
        }))
    }

    /// Answer a delivery. Errors carry the proxy's diagnostic text.
    pub async fn reply(&self, id: &str, body: impl Into<reqwest::Body>) -> SdkResult<()> {
        let resp = self.client
            .post(&self.reply_url)
            .header(X_IN_REPLY_TO, id)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Proxy returned error status {}: {}", status, text).into());
        }
        Ok(())
    }
}
