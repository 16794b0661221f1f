// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-frame pose estimates.

use crate::{Keypoint, KeypointId};
use std::time::Duration;

/// Every keypoint a model detected in one frame.
///
/// Immutable once produced: fields are private and only readable. An
/// estimate may be empty or partial (some landmarks absent or below any
/// useful confidence); downstream stages must cope with that.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PoseEstimate {
    frame_timestamp: Duration,
    model_id: String,
    keypoints: Vec<Keypoint>,
}

impl PoseEstimate {
    pub fn new(frame_timestamp: Duration, model_id: impl Into<String>, keypoints: Vec<Keypoint>) -> Self {
        Self {
            frame_timestamp,
            model_id: model_id.into(),
            keypoints,
        }
    }

    /// An estimate with no detections (e.g. nobody in frame).
    pub fn empty(frame_timestamp: Duration, model_id: impl Into<String>) -> Self {
        Self::new(frame_timestamp, model_id, Vec::new())
    }

    pub fn frame_timestamp(&self) -> Duration {
        self.frame_timestamp
    }

    /// Id of the model that produced this estimate.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Looks up a keypoint by id.
    pub fn get(&self, id: KeypointId) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.id == id)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Mean confidence over all detected keypoints (`0.0` when empty).
    pub fn mean_confidence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / self.keypoints.len() as f32
    }

    /// Number of keypoints at or above `threshold` confidence.
    pub fn confident_count(&self, threshold: f32) -> usize {
        self.keypoints
            .iter()
            .filter(|k| k.is_confident(threshold))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco;

    #[test]
    fn test_lookup_and_stats() {
        let est = PoseEstimate::new(
            Duration::from_millis(40),
            "m",
            vec![
                Keypoint::new(coco::LEFT_HIP, 0.4, 0.5, 0.9),
                Keypoint::new(coco::LEFT_KNEE, 0.4, 0.7, 0.1),
            ],
        );
        assert_eq!(est.model_id(), "m");
        assert_eq!(est.len(), 2);
        assert_eq!(est.get(coco::LEFT_KNEE).unwrap().y, 0.7);
        assert!(est.get(coco::NOSE).is_none());
        assert!((est.mean_confidence() - 0.5).abs() < 1e-6);
        assert_eq!(est.confident_count(0.3), 1);
    }

    #[test]
    fn test_empty() {
        let est = PoseEstimate::empty(Duration::ZERO, "m");
        assert!(est.is_empty());
        assert_eq!(est.mean_confidence(), 0.0);
    }
}
