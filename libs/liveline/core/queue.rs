//! Bounded outbound message queue
//!
//! Buffers messages sent while the connection is down. FIFO with a hard
//! capacity: at capacity the oldest entry is evicted (fresh status beats
//! stale status for a real-time feed). The state machine drains the queue
//! in enqueue order when the connection comes back.

use crate::envelope::Envelope;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A buffered outbound message
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub payload: Envelope,
    pub enqueued_at: DateTime<Utc>,
}

/// FIFO buffer with drop-oldest overflow
#[derive(Debug)]
pub struct OutboundQueue {
    entries: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting and returning the oldest at capacity
    pub fn enqueue(&mut self, payload: Envelope) -> Option<QueuedMessage> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        self.entries.push_back(QueuedMessage {
            payload,
            enqueued_at: Utc::now(),
        });
        evicted
    }

    /// Take the oldest entry for sending
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.entries.pop_front()
    }

    /// Put a popped entry back at the head after a failed send
    ///
    /// Used when the connection drops mid-flush: the unsent entry keeps its
    /// place so the next flush resumes exactly where this one stopped.
    pub fn requeue_front(&mut self, message: QueuedMessage) {
        self.entries.push_front(message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all buffered messages
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
