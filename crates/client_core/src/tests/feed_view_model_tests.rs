use super::*;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::ItemId;
use tokio::sync::Notify;

use crate::error::FeedError;

struct TestRepository {
    items: watch::Sender<Vec<FeedItem>>,
    refresh_calls: AtomicUsize,
    fail_with: Mutex<Option<u16>>,
    gated: AtomicBool,
    release: Notify,
}

impl TestRepository {
    fn with_items(items: Vec<FeedItem>) -> Arc<Self> {
        let (tx, _) = watch::channel(items);
        Arc::new(Self {
            items: tx,
            refresh_calls: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
            gated: AtomicBool::new(false),
            release: Notify::new(),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        let repository = Self::with_items(Vec::new());
        repository.set_failure(Some(status));
        repository
    }

    fn gated() -> Arc<Self> {
        let repository = Self::with_items(Vec::new());
        repository.gated.store(true, Ordering::SeqCst);
        repository
    }

    fn set_failure(&self, status: Option<u16>) {
        *self.fail_with.lock().expect("fail lock") = status;
    }

    fn calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for TestRepository {
    async fn refresh(&self) -> Result<(), FeedError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let failure = *self.fail_with.lock().expect("fail lock");
        match failure {
            Some(status) => Err(FeedError::Status { status }),
            None => Ok(()),
        }
    }

    fn get_items(&self) -> BoxStream<'static, Vec<FeedItem>> {
        WatchStream::new(self.items.subscribe()).boxed()
    }
}

fn sample_items() -> Vec<FeedItem> {
    vec![
        FeedItem::new(ItemId::new("a"), "https://cdn/a.jpg", true),
        FeedItem::new(ItemId::new("b"), "https://cdn/b.jpg", false),
    ]
}

async fn wait_for_state<F>(view_model: &FeedViewModel, predicate: F) -> FeedState
where
    F: FnMut(&FeedState) -> bool,
{
    let mut rx = view_model.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for feed state")
        .expect("state channel closed")
        .clone();
    state
}

async fn wait_idle(view_model: &FeedViewModel) {
    tokio::time::timeout(Duration::from_secs(5), view_model.wait_until_idle())
        .await
        .expect("refresh never finished");
}

#[test]
fn default_state_has_empty_items_and_is_idle() {
    let state = FeedState::default();
    assert_eq!(state.feed_items, Some(Vec::new()));
    assert_eq!(state.is_empty(), Some(true));
    assert!(!state.is_loading);
    assert!(state.network_errors.is_empty());
}

#[test]
fn is_empty_is_unknown_without_items() {
    let state = FeedState {
        feed_items: None,
        ..FeedState::default()
    };
    assert_eq!(state.is_empty(), None);
}

#[tokio::test]
async fn publishes_empty_list_from_repository() {
    let repository = TestRepository::with_items(Vec::new());
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    let mut items = view_model.observe_feed_items();
    assert_eq!(items.next().await.expect("items"), Some(Vec::new()));
    let mut empty = view_model.observe_is_empty();
    assert_eq!(empty.next().await.expect("is_empty"), Some(true));
}

#[tokio::test]
async fn publishes_repository_items() {
    let repository = TestRepository::with_items(sample_items());
    let view_model = FeedViewModel::new(repository.clone());

    let state = wait_for_state(&view_model, |s| s.feed_items == Some(sample_items())).await;
    assert_eq!(state.is_empty(), Some(false));
}

#[tokio::test]
async fn item_updates_do_not_touch_loading_flag() {
    let repository = TestRepository::gated();
    let view_model = FeedViewModel::new(repository.clone());
    assert!(view_model.state().is_loading);

    repository.items.send_replace(sample_items());
    let state = wait_for_state(&view_model, |s| s.feed_items == Some(sample_items())).await;
    assert!(state.is_loading);

    repository.release.notify_one();
    wait_idle(&view_model).await;
    assert_eq!(view_model.state().feed_items, Some(sample_items()));
}

#[tokio::test]
async fn construction_refreshes_once_and_ends_idle() {
    let repository = TestRepository::with_items(Vec::new());
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    assert_eq!(repository.calls(), 1);
    assert!(!view_model.state().is_loading);
    let mut loading = view_model.observe_is_loading();
    assert_eq!(loading.next().await, Some(false));
}

#[tokio::test]
async fn refresh_while_loading_is_ignored() {
    let repository = TestRepository::gated();
    let view_model = FeedViewModel::new(repository.clone());
    assert!(view_model.state().is_loading);

    for _ in 0..5 {
        assert!(view_model.refresh().is_none());
    }

    repository.release.notify_one();
    wait_idle(&view_model).await;
    assert_eq!(repository.calls(), 1);
    assert!(!view_model.state().is_loading);
}

#[tokio::test]
async fn refresh_after_idle_runs_again() {
    let repository = TestRepository::with_items(Vec::new());
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    let handle = view_model.refresh().expect("refresh should start");
    handle.await.expect("refresh task");
    assert_eq!(repository.calls(), 2);
    assert!(!view_model.state().is_loading);
}

#[tokio::test]
async fn failed_refresh_emits_error_once() {
    let repository = TestRepository::failing(503);
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    let state = view_model.state();
    assert!(!state.is_loading);
    assert_eq!(state.network_errors.len(), 1);
    assert_eq!(
        state.network_errors[0].peek_content(),
        "feed endpoint responded with status 503"
    );
    assert_eq!(
        state.take_network_errors(),
        vec!["feed endpoint responded with status 503".to_string()]
    );
    assert!(state.take_network_errors().is_empty());
    assert!(view_model.state().take_network_errors().is_empty());
}

#[tokio::test]
async fn successful_refresh_does_not_redeliver_error() {
    let repository = TestRepository::failing(504);
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;
    assert_eq!(view_model.state().take_network_errors().len(), 1);

    repository.set_failure(None);
    view_model
        .refresh()
        .expect("refresh should start")
        .await
        .expect("refresh task");

    let state = view_model.state();
    assert_eq!(state.network_errors.len(), 1);
    assert!(state.take_network_errors().is_empty());
}

#[tokio::test]
async fn each_failure_gets_its_own_event() {
    let repository = TestRepository::failing(500);
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    repository.set_failure(Some(503));
    view_model
        .refresh()
        .expect("refresh should start")
        .await
        .expect("refresh task");

    let state = view_model.state();
    assert_eq!(state.network_errors.len(), 2);
    assert!(!Arc::ptr_eq(&state.network_errors[0], &state.network_errors[1]));
    assert_eq!(
        state.network_errors[1].peek_content(),
        "feed endpoint responded with status 503"
    );
    assert!(!state.network_errors[1].has_been_handled());
}

#[tokio::test]
async fn back_to_back_failures_reach_a_late_observer() {
    let repository = TestRepository::failing(500);
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;

    repository.set_failure(Some(503));
    view_model
        .refresh()
        .expect("refresh should start")
        .await
        .expect("refresh task");

    let mut errors = view_model.observe_network_error();
    let mut delivered = Vec::new();
    while let Ok(Some(message)) =
        tokio::time::timeout(Duration::from_millis(200), errors.next()).await
    {
        delivered.push(message);
    }
    assert_eq!(
        delivered,
        vec![
            "feed endpoint responded with status 500".to_string(),
            "feed endpoint responded with status 503".to_string(),
        ]
    );

    let mut again = view_model.observe_network_error();
    assert!(
        tokio::time::timeout(Duration::from_millis(100), again.next())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn handled_errors_are_pruned_on_next_failure() {
    let repository = TestRepository::failing(500);
    let view_model = FeedViewModel::new(repository.clone());
    wait_idle(&view_model).await;
    assert_eq!(view_model.state().take_network_errors().len(), 1);

    view_model
        .refresh()
        .expect("refresh should start")
        .await
        .expect("refresh task");

    let state = view_model.state();
    assert_eq!(state.network_errors.len(), 1);
    assert!(!state.network_errors[0].has_been_handled());
}
