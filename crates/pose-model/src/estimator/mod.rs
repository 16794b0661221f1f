// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`PoseEstimator`] trait and built-in backends.

pub mod replay;
pub mod synthetic;

use crate::{EstimatorError, PoseEstimate};
use frame_queue::Frame;

/// Capability set shared by every pose-estimation backend.
///
/// Backends are assumed stateful and non-reentrant: `warm_up` and
/// `estimate` take `&mut self`, so a single instance can never have two
/// calls in flight. The caller owns the time budget; implementations do not
/// need their own timeout handling.
///
/// Lifecycle: `warm_up` → any number of `estimate` → `dispose`. Calling
/// `estimate` before a successful `warm_up` returns
/// [`EstimatorError::NotReady`].
#[async_trait::async_trait]
pub trait PoseEstimator: Send {
    /// Stable identifier, used to tag every [`PoseEstimate`].
    fn model_id(&self) -> &str;

    /// Loads weights / buffers so the first `estimate` runs at full speed.
    async fn warm_up(&mut self) -> Result<(), EstimatorError>;

    /// Detects keypoints in `frame`.
    async fn estimate(&mut self, frame: &Frame) -> Result<PoseEstimate, EstimatorError>;

    /// Releases backend resources. The instance is not used afterwards.
    fn dispose(&mut self);
}
