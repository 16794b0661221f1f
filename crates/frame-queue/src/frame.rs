// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Timestamped image buffers.

use std::sync::Arc;
use std::time::Duration;

/// A single captured video frame.
///
/// The capture collaborator owns the pixel data; cloning a `Frame` only
/// bumps a reference count. The pipeline never mutates pixels.
#[derive(Clone)]
pub struct Frame {
    timestamp: Duration,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Creates a frame from raw pixel data.
    ///
    /// `timestamp` is an offset on the capture clock; frames from one source
    /// are expected to carry increasing timestamps.
    pub fn new(timestamp: Duration, width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            timestamp,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Creates a frame with no pixel payload.
    ///
    /// Useful for sources whose estimators derive keypoints from metadata
    /// alone (synthetic and replay models, tests, benchmarks).
    pub fn blank(timestamp: Duration, width: u32, height: u32) -> Self {
        Self::new(timestamp, width, height, Vec::new())
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read-only view of the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of live references to this frame's pixel buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.pixels)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("timestamp", &self.timestamp)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_pixels() {
        let f = Frame::new(Duration::from_millis(5), 2, 2, vec![1u8, 2, 3, 4]);
        assert_eq!(f.ref_count(), 1);
        let g = f.clone();
        assert_eq!(f.ref_count(), 2);
        assert_eq!(g.pixels(), &[1, 2, 3, 4]);
        drop(g);
        assert_eq!(f.ref_count(), 1);
    }

    #[test]
    fn test_blank() {
        let f = Frame::blank(Duration::from_secs(1), 640, 480);
        assert!(f.pixels().is_empty());
        assert_eq!(f.width(), 640);
        assert_eq!(f.timestamp(), Duration::from_secs(1));
    }
}
