use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use shared::domain::FeedItem;
use storage::Storage;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use crate::{
    api::FeedApi,
    error::FeedError,
    mapping::{to_feed_items, to_stored_items, DEFAULT_THUMBNAIL_PREFIX},
};

/// Data layer seen by the presentation state holder.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetches the remote feed and swaps it into the local store atomically.
    /// A failed fetch leaves the store untouched.
    async fn refresh(&self) -> Result<(), FeedError>;

    /// Never-ending stream of the stored feed. Yields the current rows first,
    /// then again after every store write.
    fn get_items(&self) -> BoxStream<'static, Vec<FeedItem>>;
}

pub struct FeedRepository {
    api: Arc<dyn FeedApi>,
    storage: Storage,
    thumbnail_prefix: String,
}

impl FeedRepository {
    pub fn new(api: Arc<dyn FeedApi>, storage: Storage) -> Self {
        Self::with_thumbnail_prefix(api, storage, DEFAULT_THUMBNAIL_PREFIX)
    }

    pub fn with_thumbnail_prefix(
        api: Arc<dyn FeedApi>,
        storage: Storage,
        thumbnail_prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            storage,
            thumbnail_prefix: thumbnail_prefix.into(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl Repository for FeedRepository {
    async fn refresh(&self) -> Result<(), FeedError> {
        let feed = match self.api.get_feed().await {
            Ok(feed) => feed,
            Err(err) => {
                warn!(error = %err, "feed fetch failed; keeping stored items");
                return Err(err);
            }
        };

        let rows = to_stored_items(&feed.templates_metadata);
        self.storage
            .replace_feed_items(&rows)
            .await
            .map_err(FeedError::Storage)?;
        info!(items = rows.len(), "feed refreshed");
        Ok(())
    }

    fn get_items(&self) -> BoxStream<'static, Vec<FeedItem>> {
        let prefix = self.thumbnail_prefix.clone();
        WatchStream::new(self.storage.observe_feed_items())
            .map(move |rows| to_feed_items(&rows, &prefix))
            .boxed()
    }
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
