use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// FIFO of pending work. Admission appends at the tail; the worker peeks and
/// removes at the head. Every append leaves a wake permit for the worker.
#[derive(Debug)]
pub struct ScanQueue<T> {
    items: Mutex<VecDeque<T>>,
    wake: Notify,
}

impl<T> Default for ScanQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
        }
    }
}

impl<T: Clone> ScanQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: T) {
        self.items.lock().push_back(value);
        self.wake.notify_one();
    }

    pub fn peek(&self) -> Option<T> {
        self.items.lock().front().cloned()
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Resolves once something has been pushed since the last wake was consumed.
    pub async fn wait_for_work(&self) {
        self.wake.notified().await;
    }
}
