// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # frame-queue
//!
//! A bounded, drop-oldest frame buffer sitting between a camera (or any
//! other frame source) and the pose-analysis pipeline.
//!
//! # Key Components
//!
//! - [`Frame`]: a timestamped image buffer. Pixels live behind an `Arc`,
//!   so handing a frame around never copies or mutates pixel data.
//! - [`FrameQueue`]: the single-producer / single-consumer buffer. Pushing
//!   never blocks: when the queue is full the oldest frame is released
//!   before the new one is enqueued.
//! - [`QueueStats`]: cumulative counters (pushes, pops, drops, rejects).
//!
//! # Ownership Model
//!
//! ```text
//! capture ──push(frame)──► [ oldest … newest ] ──pop()──► pipeline cycle
//!                               │
//!                               └─ full? oldest frame dropped (released)
//! ```
//!
//! A frame reference is released as soon as it is dropped from the queue,
//! cleared on stop, or dropped by the consumer at the end of a cycle.
//!
//! # Example
//! ```
//! use frame_queue::{Frame, FrameQueue, PushOutcome};
//! use std::time::Duration;
//!
//! let queue = FrameQueue::new(2).unwrap();
//! for ms in [0u64, 33, 66] {
//!     queue.push(Frame::blank(Duration::from_millis(ms), 4, 4));
//! }
//! // The first frame was dropped to make room for the third.
//! assert_eq!(queue.len(), 2);
//! assert_eq!(queue.stats().dropped, 1);
//! assert_eq!(queue.try_pop().unwrap().timestamp(), Duration::from_millis(33));
//! ```

mod error;
mod frame;
pub mod queue;
mod stats;

pub use error::QueueError;
pub use frame::Frame;
pub use queue::{FrameQueue, PushOutcome, DEFAULT_CAPACITY};
pub use stats::QueueStats;
