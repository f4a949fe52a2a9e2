use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presentation-ready feed entry derived from a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    pub thumbnail_url: String,
    pub is_premium: bool,
}

impl FeedItem {
    pub fn new(id: ItemId, thumbnail_url: impl Into<String>, is_premium: bool) -> Self {
        Self {
            id,
            thumbnail_url: thumbnail_url.into(),
            is_premium,
        }
    }
}
