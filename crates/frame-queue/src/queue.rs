// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounded drop-oldest frame queue.
//!
//! The [`FrameQueue`] decouples the capture rate from the inference rate:
//!
//! 1. Pushing never blocks. When the queue is full, the oldest frame is
//!    released before the new one is enqueued, so the pipeline can never
//!    fall arbitrarily behind real time and the newest frame is never
//!    starved by backlog.
//! 2. Popping is FIFO, so the frames that survive a drop keep their
//!    capture order.
//! 3. A closed queue rejects pushes and wakes a waiting consumer.
//!
//! # Thread Safety
//! `FrameQueue` is `Clone + Send + Sync`; clones share the same buffer.
//! The capture collaborator holds one clone, the pipeline another.

use crate::{Frame, QueueError, QueueStats};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Default number of frames the queue holds.
pub const DEFAULT_CAPACITY: usize = 2;

/// What happened to a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame was enqueued without displacing anything.
    Enqueued,
    /// The frame was enqueued after the oldest queued frame was released.
    DroppedOldest,
    /// The queue is closed; the frame was released immediately.
    Rejected,
}

struct QueueState {
    frames: VecDeque<Frame>,
    closed: bool,
    stats: QueueStats,
}

struct QueueInner {
    capacity: usize,
    state: Mutex<QueueState>,
    /// Wakes the consumer on push and on close.
    ready: Notify,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-producer / single-consumer bounded frame buffer.
///
/// # Example
/// ```
/// use frame_queue::{Frame, FrameQueue, PushOutcome};
/// use std::time::Duration;
///
/// let queue = FrameQueue::new(1).unwrap();
/// assert_eq!(queue.push(Frame::blank(Duration::ZERO, 1, 1)), PushOutcome::Enqueued);
/// assert_eq!(
///     queue.push(Frame::blank(Duration::from_millis(1), 1, 1)),
///     PushOutcome::DroppedOldest,
/// );
/// ```
#[derive(Clone)]
pub struct FrameQueue {
    inner: Arc<QueueInner>,
}

impl FrameQueue {
    /// Creates an open queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            inner: Arc::new(QueueInner {
                capacity,
                state: Mutex::new(QueueState {
                    frames: VecDeque::with_capacity(capacity),
                    closed: false,
                    stats: QueueStats::default(),
                }),
                ready: Notify::new(),
            }),
        })
    }

    /// Enqueues a frame, releasing the oldest queued frame if full.
    pub fn push(&self, frame: Frame) -> PushOutcome {
        let outcome = {
            let mut state = self.inner.lock();
            if state.closed {
                state.stats.record_reject();
                return PushOutcome::Rejected;
            }

            let outcome = if state.frames.len() >= self.inner.capacity {
                // Dropping the popped value releases the frame reference.
                if let Some(oldest) = state.frames.pop_front() {
                    tracing::trace!("dropping frame at {:?} (queue full)", oldest.timestamp());
                }
                state.stats.record_drop();
                PushOutcome::DroppedOldest
            } else {
                PushOutcome::Enqueued
            };

            state.frames.push_back(frame);
            let depth = state.frames.len();
            state.stats.record_push(depth);
            outcome
        };

        self.inner.ready.notify_one();
        outcome
    }

    /// Takes the oldest queued frame without waiting.
    ///
    /// Returns `None` when the queue is empty or closed.
    pub fn try_pop(&self) -> Option<Frame> {
        let mut state = self.inner.lock();
        if state.closed {
            return None;
        }
        let frame = state.frames.pop_front()?;
        state.stats.record_pop();
        Some(frame)
    }

    /// Waits for the next frame.
    ///
    /// Returns `None` once the queue has been closed.
    pub async fn pop(&self) -> Option<Frame> {
        loop {
            let notified = self.inner.ready.notified();
            {
                let mut state = self.inner.lock();
                if state.closed {
                    return None;
                }
                if let Some(frame) = state.frames.pop_front() {
                    state.stats.record_pop();
                    return Some(frame);
                }
            }
            notified.await;
        }
    }

    /// Closes the queue: pushes are rejected and a waiting `pop` returns `None`.
    ///
    /// Frames still queued stay referenced until [`clear`](Self::clear).
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.inner.ready.notify_one();
    }

    /// Re-opens a closed queue so a restarted consumer can receive frames.
    pub fn reopen(&self) {
        self.inner.lock().closed = false;
    }

    /// Releases every queued frame and returns how many were released.
    pub fn clear(&self) -> usize {
        let mut state = self.inner.lock();
        let released = state.frames.len();
        state.frames.clear();
        state.stats.record_clear(released);
        released
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns a snapshot of the queue counters.
    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats.clone()
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("FrameQueue")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.frames.len())
            .field("closed", &state.closed)
            .finish()
    }
}
