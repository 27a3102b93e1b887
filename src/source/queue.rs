//! Bounded multi-producer event queue shared between sources and the pump.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{OverflowPolicy, QueueConfig};
use crate::event::Event;

/// Cheaply cloneable handle; all clones share one buffer.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<Inner>,
}

struct Inner {
    buf: Mutex<VecDeque<Event>>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl EventQueue {
    /// A zero capacity is bumped to 1.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                buf: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                policy,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(cfg: &QueueConfig) -> Self {
        Self::new(cfg.capacity, cfg.overflow)
    }

    /// Enqueue without blocking. Returns `false` when an event was dropped
    /// (either the evicted oldest one or `event` itself).
    pub fn push(&self, event: Event) -> bool {
        let mut buf = self.inner.buf.lock();
        if buf.len() < self.inner.capacity {
            buf.push_back(event);
            return true;
        }

        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        match self.inner.policy {
            OverflowPolicy::DropOldest => {
                buf.pop_front();
                buf.push_back(event);
            }
            OverflowPolicy::DropNewest => {}
        }
        false
    }

    /// Take everything currently queued, in enqueue order.
    pub fn drain(&self) -> Vec<Event> {
        let mut buf = self.inner.buf.lock();
        buf.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.inner.policy
    }

    /// Total events lost to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}
