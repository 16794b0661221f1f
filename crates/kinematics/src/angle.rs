// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Joint-angle computation.
//!
//! The angle at a vertex `B` between rays `B→A` and `B→C` is
//! `acos((BA · BC) / (|BA| |BC|))`. The cosine is clamped to `[-1, 1]`
//! before `acos`, so rounding never produces NaN and results stay within
//! `[0°, 180°]`.

use crate::stabilizer::{StabilizedKeypoint, StabilizedPose};
use crate::KinematicsError;
use pose_model::KeypointId;
use std::collections::HashSet;
use std::time::Duration;

/// Rays shorter than this are treated as zero-length.
const MIN_RAY_LENGTH: f32 = 1e-6;

/// A named angle: `joints = [a, vertex, c]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AngleDefinition {
    pub label: String,
    pub joints: [KeypointId; 3],
}

impl AngleDefinition {
    pub fn new(label: impl Into<String>, a: KeypointId, vertex: KeypointId, c: KeypointId) -> Self {
        Self {
            label: label.into(),
            joints: [a, vertex, c],
        }
    }

    pub fn vertex(&self) -> KeypointId {
        self.joints[1]
    }

    /// Rejects empty labels and repeated joints.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        let invalid = |detail: &str| KinematicsError::InvalidDefinition {
            label: self.label.clone(),
            detail: detail.to_string(),
        };
        if self.label.trim().is_empty() {
            return Err(invalid("label must not be empty"));
        }
        let [a, b, c] = self.joints;
        if a == b || b == c || a == c {
            return Err(invalid("joints must be three distinct keypoints"));
        }
        Ok(())
    }

    /// Computes this angle from a stabilized pose.
    pub fn compute(&self, pose: &StabilizedPose) -> Result<AngleSample, KinematicsError> {
        let mut points = Vec::with_capacity(3);
        let mut missing = Vec::new();
        for &id in &self.joints {
            match pose.usable(id) {
                Some(k) => points.push(*k),
                None => missing.push(id),
            }
        }
        if !missing.is_empty() {
            return Err(KinematicsError::InsufficientKeypoints {
                label: self.label.clone(),
                missing,
            });
        }

        let (a, b, c) = (&points[0], &points[1], &points[2]);
        let value = joint_angle(a, b, c).ok_or_else(|| KinematicsError::DegenerateGeometry {
            label: self.label.clone(),
        })?;

        Ok(AngleSample {
            label: self.label.clone(),
            value_degrees: value,
            confidence: a.confidence.min(b.confidence).min(c.confidence),
            timestamp: pose.frame_timestamp(),
        })
    }
}

/// One computed angle for one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AngleSample {
    pub label: String,
    /// Always within `[0, 180]`.
    pub value_degrees: f32,
    /// Minimum confidence of the three keypoints.
    pub confidence: f32,
    pub timestamp: Duration,
}

/// Angle at `vertex` in degrees, or `None` when a ray has zero length.
///
/// Uses depth only when all three keypoints carry it.
pub fn joint_angle(
    a: &StabilizedKeypoint,
    vertex: &StabilizedKeypoint,
    c: &StabilizedKeypoint,
) -> Option<f32> {
    let use_depth = a.z.is_some() && vertex.z.is_some() && c.z.is_some();
    let ray = |p: &StabilizedKeypoint| {
        let dz = if use_depth {
            p.z.unwrap_or(0.0) - vertex.z.unwrap_or(0.0)
        } else {
            0.0
        };
        [p.x - vertex.x, p.y - vertex.y, dz]
    };
    let v1 = ray(a);
    let v2 = ray(c);

    let dot = v1[0] * v2[0] + v1[1] * v2[1] + v1[2] * v2[2];
    let mag1 = (v1[0] * v1[0] + v1[1] * v1[1] + v1[2] * v1[2]).sqrt();
    let mag2 = (v2[0] * v2[0] + v2[1] * v2[1] + v2[2] * v2[2]).sqrt();
    if !(mag1 >= MIN_RAY_LENGTH && mag2 >= MIN_RAY_LENGTH) {
        return None;
    }

    let cos = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees().clamp(0.0, 180.0))
}

/// Evaluates a fixed list of angle definitions.
#[derive(Debug, Clone)]
pub struct AngleEngine {
    definitions: Vec<AngleDefinition>,
}

impl AngleEngine {
    /// Validates every definition and checks labels are unique.
    pub fn new(definitions: Vec<AngleDefinition>) -> Result<Self, KinematicsError> {
        let mut seen = HashSet::new();
        for def in &definitions {
            def.validate()?;
            if !seen.insert(def.label.as_str()) {
                return Err(KinematicsError::InvalidDefinition {
                    label: def.label.clone(),
                    detail: "duplicate label".into(),
                });
            }
        }
        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[AngleDefinition] {
        &self.definitions
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.label.as_str())
    }

    /// Computes all angles that can be computed, in definition order.
    ///
    /// Angles whose keypoints are missing or degenerate are left out.
    pub fn compute(&self, pose: &StabilizedPose) -> Vec<AngleSample> {
        self.definitions
            .iter()
            .filter_map(|def| match def.compute(pose) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    tracing::debug!("{e}");
                    None
                }
            })
            .collect()
    }

    /// Like [`compute`](Self::compute) but keeps one result per definition.
    pub fn compute_detailed(
        &self,
        pose: &StabilizedPose,
    ) -> Vec<Result<AngleSample, KinematicsError>> {
        self.definitions.iter().map(|def| def.compute(pose)).collect()
    }
}
