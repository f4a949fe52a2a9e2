use std::{collections::VecDeque, sync::Arc};

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use shared::domain::FeedItem;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::{event::Event, repository::Repository};

#[derive(Debug, Clone)]
pub struct FeedState {
    /// `None` until the repository has produced a value.
    pub feed_items: Option<Vec<FeedItem>>,
    pub is_loading: bool,
    /// One event per failed refresh, oldest first. Handled events are pruned
    /// when the next failure is recorded.
    pub network_errors: VecDeque<Arc<Event<String>>>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            feed_items: Some(Vec::new()),
            is_loading: false,
            network_errors: VecDeque::new(),
        }
    }
}

impl FeedState {
    pub fn is_empty(&self) -> Option<bool> {
        self.feed_items.as_ref().map(Vec::is_empty)
    }

    /// Consumes every error message nobody has handled yet.
    pub fn take_network_errors(&self) -> Vec<String> {
        self.network_errors
            .iter()
            .filter_map(|event| event.get_content_if_not_handled())
            .collect()
    }
}

/// Mirrors repository state into observable feed state and runs refreshes.
///
/// At most one refresh is in flight: [`FeedViewModel::refresh`] checks and
/// sets `is_loading` under the state channel's lock. Must be created inside a
/// Tokio runtime.
pub struct FeedViewModel {
    repository: Arc<dyn Repository>,
    state: Arc<watch::Sender<FeedState>>,
    observer: JoinHandle<()>,
}

impl FeedViewModel {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        let state = Arc::new(state);
        let observer = tokio::spawn(observe_items(repository.get_items(), Arc::clone(&state)));
        let view_model = Self {
            repository,
            state,
            observer,
        };
        view_model.refresh();
        view_model
    }

    /// Starts a refresh unless one is already running.
    ///
    /// Returns the handle of the spawned refresh, or `None` when the call was
    /// dropped because a refresh is in flight.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let started = update_state(&self.state, |state| {
            if state.is_loading {
                return false;
            }
            state.is_loading = true;
            true
        });
        if !started {
            debug!("feed refresh already in flight");
            return None;
        }

        let repository = Arc::clone(&self.repository);
        let mut loading = LoadingGuard {
            state: Arc::clone(&self.state),
            error: None,
        };
        Some(tokio::spawn(async move {
            if let Err(err) = repository.refresh().await {
                warn!(error = %err, "feed refresh failed");
                loading.error = Some(err.to_string());
            }
        }))
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn observe_feed_items(&self) -> BoxStream<'static, Option<Vec<FeedItem>>> {
        self.project(|state| state.feed_items.clone())
    }

    pub fn observe_is_empty(&self) -> BoxStream<'static, Option<bool>> {
        self.project(FeedState::is_empty)
    }

    pub fn observe_is_loading(&self) -> BoxStream<'static, bool> {
        self.project(|state| state.is_loading)
    }

    /// Yields each failure message once, across all observers.
    pub fn observe_network_error(&self) -> BoxStream<'static, String> {
        WatchStream::new(self.state.subscribe())
            .flat_map(|state| stream::iter(state.take_network_errors()))
            .boxed()
    }

    /// Resolves once no refresh is in flight.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| !state.is_loading).await;
    }

    fn project<T, F>(&self, f: F) -> BoxStream<'static, T>
    where
        T: Send + 'static,
        F: Fn(&FeedState) -> T + Send + 'static,
    {
        WatchStream::new(self.state.subscribe())
            .map(move |state| f(&state))
            .boxed()
    }
}

impl Drop for FeedViewModel {
    fn drop(&mut self) {
        self.observer.abort();
    }
}

/// Clears `is_loading` when the refresh task ends, including on panic, and
/// queues the pending error in the same transition.
struct LoadingGuard {
    state: Arc<watch::Sender<FeedState>>,
    error: Option<String>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let error = self.error.take();
        update_state(&self.state, |state| {
            state.is_loading = false;
            if let Some(message) = error {
                state.network_errors.retain(|event| !event.has_been_handled());
                state
                    .network_errors
                    .push_back(Arc::new(Event::new(message)));
            }
            true
        });
    }
}

async fn observe_items(
    mut items: BoxStream<'static, Vec<FeedItem>>,
    state: Arc<watch::Sender<FeedState>>,
) {
    while let Some(feed_items) = items.next().await {
        update_state(&state, |state| {
            state.feed_items = Some(feed_items);
            true
        });
    }
}

/// The only place feed state changes. Returns whether observers were notified.
fn update_state<F>(state: &watch::Sender<FeedState>, transform: F) -> bool
where
    F: FnOnce(&mut FeedState) -> bool,
{
    state.send_if_modified(transform)
}

#[cfg(test)]
#[path = "tests/feed_view_model_tests.rs"]
mod tests;
