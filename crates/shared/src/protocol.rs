use serde::{Deserialize, Serialize};

use crate::domain::ItemId;

/// One template record as served by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub configuration: String,
    pub id: ItemId,
    pub is_new: bool,
    pub is_premium: bool,
    pub template_categories: Vec<String>,
    pub template_name: String,
    #[serde(rename = "templateThumbnailURI")]
    pub template_thumbnail_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetFeedResponse {
    #[serde(rename = "templatesMetadata")]
    pub templates_metadata: Vec<ItemDto>,
}

impl GetFeedResponse {
    pub fn new(templates_metadata: Vec<ItemDto>) -> Self {
        Self { templates_metadata }
    }
}
