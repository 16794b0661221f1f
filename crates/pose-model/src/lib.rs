// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pose-model
//!
//! The keypoint data model and the swappable pose-estimator abstraction.
//!
//! - [`Keypoint`] / [`KeypointId`]: a detected landmark with normalized
//!   position and confidence. The [`coco`] module names the 17 standard
//!   COCO/MoveNet landmarks.
//! - [`PoseEstimate`]: every keypoint detected in one frame, tagged with the
//!   frame timestamp and the id of the model that produced it.
//! - [`PoseEstimator`]: the capability set every backend implements:
//!   `warm_up`, `estimate`, `dispose`.
//! - [`EstimatorRegistry`]: maps string ids to estimator factories so the
//!   pipeline can hot-swap models by name.
//!
//! # Built-in Backends
//!
//! | Id | Type | Purpose |
//! |---|---|---|
//! | `synthetic-squat` | [`SyntheticSquat`] | Clean procedural squat motion |
//! | `synthetic-squat-noisy` | [`SyntheticSquat`] | Same motion with jitter and dropouts |
//! | `replay` | [`ReplayEstimator`] | Plays back recorded keypoints (registered on demand) |
//!
//! # Trait-Based Extensibility
//!
//! ```ignore
//! struct OnnxMoveNet { /* session */ }
//!
//! #[async_trait::async_trait]
//! impl PoseEstimator for OnnxMoveNet {
//!     fn model_id(&self) -> &str { "movenet-lightning" }
//!     async fn warm_up(&mut self) -> Result<(), EstimatorError> { /* load */ }
//!     async fn estimate(&mut self, frame: &Frame) -> Result<PoseEstimate, EstimatorError> { /* run */ }
//!     fn dispose(&mut self) { /* drop session */ }
//! }
//!
//! registry.register("movenet-lightning", || Box::new(OnnxMoveNet::new()));
//! ```

mod error;
mod estimate;
pub mod estimator;
mod keypoint;
mod registry;

pub use error::EstimatorError;
pub use estimate::PoseEstimate;
pub use estimator::replay::ReplayEstimator;
pub use estimator::synthetic::{squat_keypoints, SyntheticSettings, SyntheticSquat};
pub use estimator::PoseEstimator;
pub use keypoint::{coco, Keypoint, KeypointId};
pub use registry::{EstimatorFactory, EstimatorRegistry};
