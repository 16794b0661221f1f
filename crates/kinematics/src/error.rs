// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for stabilization and angle computation.

use pose_model::KeypointId;

/// Errors produced while configuring or evaluating kinematics.
///
/// The per-frame variants ([`InsufficientKeypoints`](Self::InsufficientKeypoints),
/// [`DegenerateGeometry`](Self::DegenerateGeometry)) are recoverable: the
/// affected angle is simply left out of that cycle's output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KinematicsError {
    /// One or more keypoints of an angle are missing from the pose.
    #[error("angle '{label}' skipped: keypoints {missing:?} missing")]
    InsufficientKeypoints {
        label: String,
        missing: Vec<KeypointId>,
    },

    /// Two keypoints of an angle coincide, so a ray has no direction.
    #[error("angle '{label}' skipped: degenerate geometry")]
    DegenerateGeometry { label: String },

    /// An angle definition is malformed.
    #[error("invalid angle definition '{label}': {detail}")]
    InvalidDefinition { label: String, detail: String },

    /// Stabilizer settings are out of range.
    #[error("invalid stabilizer configuration: {0}")]
    InvalidConfig(String),
}
