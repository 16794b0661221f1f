// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kinematics
//!
//! Turns noisy per-frame keypoints into joint angles.
//!
//! ```text
//! PoseEstimate ──► Stabilizer ──► StabilizedPose ──► AngleEngine ──► [AngleSample]
//!                  (rings per id)   (missing flags)    (pure)
//! ```
//!
//! - [`Stabilizer`] keeps a fixed [`Ring`] of recent confident observations
//!   per keypoint and produces confidence-weighted, gap-filled positions.
//!   Keypoints that stay unreliable for too long are flagged `missing`
//!   instead of being extrapolated.
//! - [`AngleEngine`] evaluates every [`AngleDefinition`] against a
//!   [`StabilizedPose`]. Definitions touching a missing keypoint are
//!   omitted from the output, never zero-filled.
//!
//! # Example
//! ```
//! use kinematics::{AngleDefinition, AngleEngine, Stabilizer, StabilizerConfig};
//! use pose_model::{coco, squat_keypoints, PoseEstimate};
//! use std::time::Duration;
//!
//! let mut stabilizer = Stabilizer::new(StabilizerConfig::default()).unwrap();
//! let engine = AngleEngine::new(vec![AngleDefinition::new(
//!     "left_knee",
//!     coco::LEFT_HIP,
//!     coco::LEFT_KNEE,
//!     coco::LEFT_ANKLE,
//! )])
//! .unwrap();
//!
//! let estimate = PoseEstimate::new(Duration::ZERO, "demo", squat_keypoints(120.0, 100.0));
//! let pose = stabilizer.update(&estimate);
//! let angles = engine.compute(&pose);
//! assert!((angles[0].value_degrees - 120.0).abs() < 0.1);
//! ```

mod angle;
mod error;
pub mod ring;
mod stabilizer;

pub use angle::{joint_angle, AngleDefinition, AngleEngine, AngleSample};
pub use error::KinematicsError;
pub use ring::Ring;
pub use stabilizer::{StabilizedKeypoint, StabilizedPose, Stabilizer, StabilizerConfig};
