// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Keypoints: detected anatomical landmarks.

use std::fmt;

/// Identifier of an anatomical landmark within a model's skeleton layout.
///
/// Ids are plain integers so that backends with different layouts can
/// coexist; the [`coco`] module names the common 17-point layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct KeypointId(pub u16);

impl KeypointId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KeypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match coco::name(*self) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "#{}", self.0),
        }
    }
}

/// A single detected landmark.
///
/// `x` and `y` are normalized to the frame (0.0 = left/top, 1.0 = right/bottom);
/// `z` is an optional relative depth for backends that provide one.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keypoint {
    pub id: KeypointId,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Detection confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl Keypoint {
    /// Creates a 2D keypoint. Confidence is clamped to `[0.0, 1.0]`.
    pub fn new(id: KeypointId, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            id,
            x,
            y,
            z: None,
            confidence: clamp_confidence(confidence),
        }
    }

    /// Creates a keypoint with depth.
    pub fn with_depth(id: KeypointId, x: f32, y: f32, z: f32, confidence: f32) -> Self {
        Self {
            z: Some(z),
            ..Self::new(id, x, y, confidence)
        }
    }

    /// Whether the detection is at least `threshold` confident.
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

fn clamp_confidence(c: f32) -> f32 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

/// The 17-keypoint COCO layout used by MoveNet and most single-person models.
pub mod coco {
    use super::KeypointId;

    pub const NOSE: KeypointId = KeypointId(0);
    pub const LEFT_EYE: KeypointId = KeypointId(1);
    pub const RIGHT_EYE: KeypointId = KeypointId(2);
    pub const LEFT_EAR: KeypointId = KeypointId(3);
    pub const RIGHT_EAR: KeypointId = KeypointId(4);
    pub const LEFT_SHOULDER: KeypointId = KeypointId(5);
    pub const RIGHT_SHOULDER: KeypointId = KeypointId(6);
    pub const LEFT_ELBOW: KeypointId = KeypointId(7);
    pub const RIGHT_ELBOW: KeypointId = KeypointId(8);
    pub const LEFT_WRIST: KeypointId = KeypointId(9);
    pub const RIGHT_WRIST: KeypointId = KeypointId(10);
    pub const LEFT_HIP: KeypointId = KeypointId(11);
    pub const RIGHT_HIP: KeypointId = KeypointId(12);
    pub const LEFT_KNEE: KeypointId = KeypointId(13);
    pub const RIGHT_KNEE: KeypointId = KeypointId(14);
    pub const LEFT_ANKLE: KeypointId = KeypointId(15);
    pub const RIGHT_ANKLE: KeypointId = KeypointId(16);

    pub const COUNT: usize = 17;

    const NAMES: [&str; COUNT] = [
        "nose",
        "left_eye",
        "right_eye",
        "left_ear",
        "right_ear",
        "left_shoulder",
        "right_shoulder",
        "left_elbow",
        "right_elbow",
        "left_wrist",
        "right_wrist",
        "left_hip",
        "right_hip",
        "left_knee",
        "right_knee",
        "left_ankle",
        "right_ankle",
    ];

    /// Returns the COCO name of `id`, if it is part of the layout.
    pub fn name(id: KeypointId) -> Option<&'static str> {
        NAMES.get(id.index()).copied()
    }

    /// Looks up a COCO keypoint by name (e.g. `"left_knee"`).
    pub fn by_name(name: &str) -> Option<KeypointId> {
        NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| KeypointId(i as u16))
    }

    /// All 17 ids in layout order.
    pub fn all() -> impl Iterator<Item = KeypointId> {
        (0..COUNT as u16).map(KeypointId)
    }
}
