//! Bounded hand-off between ingestion and classification. Pushing never waits: when the queue
//! is full the oldest pending item is evicted and handed back to the caller.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct DropOldestQueue<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue without blocking; returns the evicted item when the queue was full.
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut st = self.lock();
            let evicted = if st.items.len() >= self.capacity {
                st.items.pop_front()
            } else {
                None
            };
            st.items.push_back(item);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    /// Next item in FIFO order. `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before looking, so a push or close between the check and the await
            // still wakes us
            notified.as_mut().enable();
            {
                let mut st = self.lock();
                if let Some(item) = st.items.pop_front() {
                    return Some(item);
                }
                if st.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// No more pushes are coming; consumers drain what is left and then stop.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
