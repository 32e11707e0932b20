use std::future::Future;

use thiserror::Error;
use tracing::debug;

use hush_types::Message;

/// Path of the history endpoint, relative to the relay base URL.
pub const HISTORY_PATH: &str = "/api/v1/chats";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("history endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

/// Where a session gets its initial message log from.
pub trait HistorySource: Send + Sync {
    /// Fetch the full conversation, oldest first.
    fn fetch(&self) -> impl Future<Output = Result<Vec<Message>, HistoryError>> + Send;
}

/// `GET {base}/api/v1/chats`. No paging, filtering or auth header.
#[derive(Debug, Clone)]
pub struct HttpHistory {
    client: reqwest::Client,
    url: String,
}

impl HttpHistory {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), HISTORY_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HistorySource for HttpHistory {
    async fn fetch(&self) -> Result<Vec<Message>, HistoryError> {
        debug!("Fetching history from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status));
        }

        let messages: Vec<Message> = response.json().await?;
        debug!("Fetched {} message(s) from {}", messages.len(), self.url);
        Ok(messages)
    }
}
