use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed endpoint responded with status {status}")]
    Status { status: u16 },
    #[error("malformed feed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("local feed store failed: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl FeedError {
    /// True for every failure that happens before the local store is touched.
    pub fn is_fetch_failure(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
