use std::sync::atomic::{AtomicBool, Ordering};

/// Value that hands its content out at most once.
///
/// Observers of a state stream may see the same `Arc<Event<T>>` many times;
/// only the first [`Event::get_content_if_not_handled`] call across all of
/// them returns the content.
#[derive(Debug)]
pub struct Event<T> {
    content: T,
    handled: AtomicBool,
}

impl<T> Event<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            handled: AtomicBool::new(false),
        }
    }

    pub fn has_been_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    pub fn peek_content(&self) -> &T {
        &self.content
    }
}

impl<T: Clone> Event<T> {
    pub fn get_content_if_not_handled(&self) -> Option<T> {
        if self.handled.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(self.content.clone())
        }
    }
}
