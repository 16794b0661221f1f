// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Queue statistics for backpressure diagnostics.
//!
//! [`QueueStats`] tracks how often the capture side outruns inference.
//! A high drop ratio means the estimator cannot keep up with the camera.

/// Cumulative counters for a [`FrameQueue`](crate::FrameQueue).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    /// Frames accepted by `push` (including those that displaced another).
    pub pushed: u64,
    /// Frames handed to the consumer.
    pub popped: u64,
    /// Frames released because the queue was full.
    pub dropped: u64,
    /// Frames released because the queue was closed.
    pub rejected: u64,
    /// Frames released by `clear`.
    pub released_on_clear: u64,
    /// Deepest the queue has ever been.
    pub high_water_mark: usize,
}

impl QueueStats {
    /// Fraction of accepted frames that were dropped, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` if nothing has been pushed.
    pub fn drop_ratio(&self) -> f64 {
        if self.pushed == 0 {
            return 0.0;
        }
        self.dropped as f64 / self.pushed as f64
    }

    pub(crate) fn record_push(&mut self, depth: usize) {
        self.pushed += 1;
        if depth > self.high_water_mark {
            self.high_water_mark = depth;
        }
    }

    pub(crate) fn record_pop(&mut self) {
        self.popped += 1;
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub(crate) fn record_reject(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn record_clear(&mut self, released: usize) {
        self.released_on_clear += released as u64;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Frames: {} pushed, {} popped, {} dropped ({:.0}% drop rate), \
             {} rejected, {} cleared, max depth {}",
            self.pushed,
            self.popped,
            self.dropped,
            self.drop_ratio() * 100.0,
            self.rejected,
            self.released_on_clear,
            self.high_water_mark,
        )
    }
}
