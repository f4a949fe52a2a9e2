//! Feed client core: remote source, repository and presentation state.

pub mod api;
pub mod error;
pub mod event;
mod feed_view_model;
pub mod mapping;
mod repository;

pub use api::{FeedApi, HttpFeedApi};
pub use error::FeedError;
pub use event::Event;
pub use feed_view_model::{FeedState, FeedViewModel};
pub use repository::{FeedRepository, Repository};
