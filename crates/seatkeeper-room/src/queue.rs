//! The request queue: the only state a room shares with its worker.
//!
//! The control side pushes textual requests (player actions, observe
//! and leave notices); the worker thread polls them out in FIFO order.
//! Every operation takes the mutex for exactly one push, fetch, or clear,
//! so the lock is never held while rules are being evaluated.
//!
//! The queue is *open* while the room's game runs. A closed queue drops
//! pushes and always fetches nothing. The worker can watch
//! [`RequestQueue::is_open`] to learn that the room ended its game.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seatkeeper_protocol::RoomId;

use crate::RoomError;

/// A bounded, thread-safe FIFO of request strings. Cheap to clone; all
/// clones share one queue.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    room_id: RoomId,
    bound: usize,
    open: AtomicBool,
    entries: Mutex<VecDeque<String>>,
}

impl RequestQueue {
    /// Creates a closed, empty queue holding at most `bound` requests.
    pub fn new(room_id: RoomId, bound: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                room_id,
                bound,
                open: AtomicBool::new(false),
                entries: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Appends a request.
    ///
    /// # Errors
    /// - [`RoomError::NotStarted`]: the queue is closed; the request is
    ///   dropped.
    /// - [`RoomError::QueueFull`]: the bound is reached; the request is
    ///   dropped.
    pub fn push(&self, request: impl Into<String>) -> Result<(), RoomError> {
        if !self.is_open() {
            return Err(RoomError::NotStarted(self.inner.room_id));
        }
        let mut entries = self.entries();
        if entries.len() >= self.inner.bound {
            tracing::warn!(
                room_id = %self.inner.room_id,
                bound = self.inner.bound,
                "request queue full, dropping request"
            );
            return Err(RoomError::QueueFull(self.inner.room_id));
        }
        entries.push_back(request.into());
        Ok(())
    }

    /// Takes the oldest request. Never blocks.
    ///
    /// Returns `None` when the queue is empty or closed. Waiting and
    /// backing off between polls is the caller's business.
    pub fn fetch(&self) -> Option<String> {
        if !self.is_open() {
            return None;
        }
        self.entries().pop_front()
    }

    /// Drops every pending request.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Returns `true` if at least one request is pending.
    pub fn has_request(&self) -> bool {
        !self.entries().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_request()
    }

    /// Returns `true` while the owning room's game runs.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    pub fn room_id(&self) -> RoomId {
        self.inner.room_id
    }

    pub(crate) fn open(&self) {
        self.inner.open.store(true, Ordering::Release);
    }

    pub(crate) fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
