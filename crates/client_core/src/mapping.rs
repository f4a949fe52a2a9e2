use shared::{domain::FeedItem, protocol::ItemDto};
use storage::StoredFeedItem;

pub const DEFAULT_THUMBNAIL_PREFIX: &str =
    "https://assets.swishvideoapp.com/Android/demo/catalog/thumbnails/";

pub fn to_stored_items(items: &[ItemDto]) -> Vec<StoredFeedItem> {
    items
        .iter()
        .map(|item| StoredFeedItem {
            id: item.id.clone(),
            thumbnail_path: item.template_thumbnail_uri.clone(),
            is_premium: item.is_premium,
        })
        .collect()
}

pub fn to_feed_items(rows: &[StoredFeedItem], thumbnail_prefix: &str) -> Vec<FeedItem> {
    rows.iter()
        .map(|row| FeedItem {
            id: row.id.clone(),
            thumbnail_url: format!("{thumbnail_prefix}{}", row.thumbnail_path),
            is_premium: row.is_premium,
        })
        .collect()
}
