// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Temporal keypoint stabilization.
//!
//! Each keypoint id gets its own [`Ring`] of recent confident observations.
//! The stabilized position is the confidence-weighted mean of that ring.
//! Low-confidence or absent observations do not enter the ring; the keypoint
//! is gap-filled from the ring for a bounded number of frames and is then
//! reported as missing.

use crate::ring::Ring;
use crate::KinematicsError;
use pose_model::{KeypointId, PoseEstimate};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Stabilizer settings (`[stabilizer]` table of the pipeline config).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Confident observations kept per keypoint.
    pub window: usize,
    /// Observations below this confidence are treated as gaps.
    pub min_confidence: f32,
    /// Consecutive low-confidence frames tolerated before a keypoint is missing.
    pub max_low_confidence_frames: u32,
    /// Time without a confident observation after which the ring restarts.
    pub max_gap_ms: u64,
}

impl StabilizerConfig {
    pub fn max_gap(&self) -> Duration {
        Duration::from_millis(self.max_gap_ms)
    }

    /// Checks every field is in range.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        if self.window == 0 {
            return Err(KinematicsError::InvalidConfig(
                "window must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(KinematicsError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_gap_ms == 0 {
            return Err(KinematicsError::InvalidConfig(
                "max_gap_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            window: 5,
            min_confidence: 0.3,
            max_low_confidence_frames: 3,
            max_gap_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    x: f32,
    y: f32,
    z: Option<f32>,
    confidence: f32,
}

#[derive(Debug)]
struct Track {
    ring: Ring<Observation>,
    low_streak: u32,
    last_confident: Option<Duration>,
}

impl Track {
    fn new(window: usize) -> Self {
        Self {
            ring: Ring::new(window),
            low_streak: 0,
            last_confident: None,
        }
    }

    /// Confidence-weighted mean of the ring, or `None` if it is empty.
    fn smoothed(&self) -> Option<Observation> {
        if self.ring.is_empty() {
            return None;
        }
        let n = self.ring.len() as f32;
        let weight: f32 = self.ring.iter().map(|o| o.confidence).sum();
        let with_depth = self.ring.iter().all(|o| o.z.is_some());

        let (mut x, mut y, mut z) = (0.0f32, 0.0f32, 0.0f32);
        for o in self.ring.iter() {
            // Equal weights when every entry has zero confidence.
            let w = if weight > 0.0 { o.confidence / weight } else { 1.0 / n };
            x += w * o.x;
            y += w * o.y;
            z += w * o.z.unwrap_or(0.0);
        }
        Some(Observation {
            x,
            y,
            z: with_depth.then_some(z),
            confidence: weight / n,
        })
    }
}

/// One keypoint of a [`StabilizedPose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizedKeypoint {
    pub id: KeypointId,
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub confidence: f32,
    /// The keypoint has been unreliable for too long and must not be used.
    pub missing: bool,
    /// This frame's observation was unusable and the value comes from history.
    pub gap_filled: bool,
}

/// Smoothed keypoints for a single frame, ordered by keypoint id.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedPose {
    frame_timestamp: Duration,
    model_id: String,
    keypoints: Vec<StabilizedKeypoint>,
}

impl StabilizedPose {
    pub fn new(
        frame_timestamp: Duration,
        model_id: impl Into<String>,
        keypoints: Vec<StabilizedKeypoint>,
    ) -> Self {
        Self {
            frame_timestamp,
            model_id: model_id.into(),
            keypoints,
        }
    }

    pub fn frame_timestamp(&self) -> Duration {
        self.frame_timestamp
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn keypoints(&self) -> &[StabilizedKeypoint] {
        &self.keypoints
    }

    pub fn get(&self, id: KeypointId) -> Option<&StabilizedKeypoint> {
        self.keypoints.iter().find(|k| k.id == id)
    }

    /// The keypoint if it is tracked and not missing.
    pub fn usable(&self, id: KeypointId) -> Option<&StabilizedKeypoint> {
        self.get(id).filter(|k| !k.missing)
    }

    pub fn missing_count(&self) -> usize {
        self.keypoints.iter().filter(|k| k.missing).count()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Per-keypoint temporal smoother.
pub struct Stabilizer {
    config: StabilizerConfig,
    tracks: BTreeMap<KeypointId, Track>,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Result<Self, KinematicsError> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Number of keypoint ids seen since the last reset.
    pub fn tracked(&self) -> usize {
        self.tracks.len()
    }

    /// Forgets all history.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// Folds one estimate into the rings and returns the stabilized pose.
    ///
    /// Works for empty and partial estimates: ids absent from `estimate`
    /// count as a low-confidence frame for that keypoint.
    pub fn update(&mut self, estimate: &PoseEstimate) -> StabilizedPose {
        let now = estimate.frame_timestamp();
        let max_gap = self.config.max_gap();
        let window = self.config.window;
        let mut confident = BTreeSet::new();

        for kp in estimate.keypoints() {
            let track = self
                .tracks
                .entry(kp.id)
                .or_insert_with(|| Track::new(window));
            if !kp.is_confident(self.config.min_confidence) {
                continue;
            }
            if let Some(last) = track.last_confident {
                if now.saturating_sub(last) > max_gap {
                    tracing::trace!(keypoint = %kp.id, "re-acquired after gap; ring reset");
                    track.ring.clear();
                }
            }
            track.ring.push(Observation {
                x: kp.x,
                y: kp.y,
                z: kp.z,
                confidence: kp.confidence,
            });
            track.last_confident = Some(now);
            confident.insert(kp.id);
        }

        let limit = self.config.max_low_confidence_frames;
        let keypoints = self
            .tracks
            .iter_mut()
            .map(|(&id, track)| {
                if confident.contains(&id) {
                    track.low_streak = 0;
                } else {
                    track.low_streak = track.low_streak.saturating_add(1);
                }
                match track.smoothed() {
                    Some(o) if track.low_streak <= limit => StabilizedKeypoint {
                        id,
                        x: o.x,
                        y: o.y,
                        z: o.z,
                        confidence: o.confidence,
                        missing: false,
                        gap_filled: track.low_streak > 0,
                    },
                    last => StabilizedKeypoint {
                        id,
                        x: last.map_or(0.0, |o| o.x),
                        y: last.map_or(0.0, |o| o.y),
                        z: None,
                        confidence: 0.0,
                        missing: true,
                        gap_filled: false,
                    },
                }
            })
            .collect();

        StabilizedPose::new(now, estimate.model_id(), keypoints)
    }
}

impl std::fmt::Debug for Stabilizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stabilizer")
            .field("window", &self.config.window)
            .field("tracked", &self.tracks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pose_model::{coco, squat_keypoints, Keypoint};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn single(t: u64, x: f32, confidence: f32) -> PoseEstimate {
        PoseEstimate::new(
            ms(t),
            "test",
            vec![Keypoint::new(coco::LEFT_KNEE, x, 0.5, confidence)],
        )
    }

    fn stabilizer() -> Stabilizer {
        Stabilizer::new(StabilizerConfig::default()).unwrap()
    }

    #[test]
    fn test_first_observation_passes_through() {
        let mut s = stabilizer();
        let pose = s.update(&single(0, 0.4, 0.9));
        let k = pose.get(coco::LEFT_KNEE).unwrap();
        assert!((k.x - 0.4).abs() < 1e-6);
        assert!((k.confidence - 0.9).abs() < 1e-6);
        assert!(!k.missing);
        assert!(!k.gap_filled);
    }

    #[test]
    fn test_confidence_weighted_mean() {
        let mut s = stabilizer();
        s.update(&single(0, 0.0, 0.9));
        let pose = s.update(&single(33, 1.0, 0.3));
        let k = pose.get(coco::LEFT_KNEE).unwrap();
        // (0.9 * 0 + 0.3 * 1) / 1.2
        assert!((k.x - 0.25).abs() < 1e-5);
        assert!((k.confidence - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_window_bounds_history() {
        let mut s = Stabilizer::new(StabilizerConfig {
            window: 2,
            ..Default::default()
        })
        .unwrap();
        s.update(&single(0, 0.0, 0.9));
        s.update(&single(33, 1.0, 0.9));
        let pose = s.update(&single(66, 1.0, 0.9));
        assert!((pose.get(coco::LEFT_KNEE).unwrap().x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gap_fill_then_missing() {
        let mut s = stabilizer();
        s.update(&single(0, 0.4, 0.9));
        for i in 1..=3u64 {
            let pose = s.update(&single(i * 33, 0.9, 0.1));
            let k = pose.get(coco::LEFT_KNEE).unwrap();
            assert!(!k.missing, "frame {i} should be gap-filled");
            assert!(k.gap_filled);
            assert!((k.x - 0.4).abs() < 1e-6, "low-confidence x must not leak in");
        }
        let pose = s.update(&single(4 * 33, 0.9, 0.1));
        let k = pose.get(coco::LEFT_KNEE).unwrap();
        assert!(k.missing);
        assert!(pose.usable(coco::LEFT_KNEE).is_none());
        assert_eq!(pose.missing_count(), 1);
    }

    #[test]
    fn test_absent_keypoint_counts_as_low_confidence() {
        let mut s = stabilizer();
        s.update(&single(0, 0.4, 0.9));
        for i in 1..=3u64 {
            let pose = s.update(&PoseEstimate::empty(ms(i * 33), "test"));
            assert!(!pose.get(coco::LEFT_KNEE).unwrap().missing);
        }
        let pose = s.update(&PoseEstimate::empty(ms(132), "test"));
        assert!(pose.get(coco::LEFT_KNEE).unwrap().missing);
    }

    #[test]
    fn test_never_confident_is_missing() {
        let mut s = stabilizer();
        let pose = s.update(&single(0, 0.4, 0.1));
        assert!(pose.get(coco::LEFT_KNEE).unwrap().missing);
    }

    #[test]
    fn test_recovers_after_missing() {
        let mut s = stabilizer();
        s.update(&single(0, 0.4, 0.9));
        for i in 1..=5u64 {
            s.update(&single(i * 33, 0.4, 0.0));
        }
        let pose = s.update(&single(6 * 33, 0.6, 0.9));
        let k = pose.get(coco::LEFT_KNEE).unwrap();
        assert!(!k.missing);
        assert!(!k.gap_filled);
    }

    #[test]
    fn test_long_gap_resets_ring() {
        let mut s = Stabilizer::new(StabilizerConfig {
            max_low_confidence_frames: 100,
            ..Default::default()
        })
        .unwrap();
        s.update(&single(0, 0.0, 0.9));
        s.update(&single(33, 0.0, 0.9));
        // Confident again 600 ms later: old samples must not be blended in.
        let pose = s.update(&single(633, 1.0, 0.9));
        assert!((pose.get(coco::LEFT_KNEE).unwrap().x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_depth_only_when_all_entries_have_it() {
        let mut s = stabilizer();
        let with_z = |t, z| {
            PoseEstimate::new(
                ms(t),
                "test",
                vec![Keypoint::with_depth(coco::LEFT_KNEE, 0.5, 0.5, z, 0.8)],
            )
        };
        let pose = s.update(&with_z(0, 0.2));
        assert_eq!(pose.get(coco::LEFT_KNEE).unwrap().z, Some(0.2));
        let pose = s.update(&single(33, 0.5, 0.8));
        assert_eq!(pose.get(coco::LEFT_KNEE).unwrap().z, None);
    }

    #[test]
    fn test_full_skeleton_and_reset() {
        let mut s = stabilizer();
        let pose = s.update(&PoseEstimate::new(ms(0), "synthetic", squat_keypoints(170.0, 175.0)));
        assert_eq!(pose.len(), coco::COUNT);
        assert_eq!(pose.model_id(), "synthetic");
        assert_eq!(s.tracked(), coco::COUNT);
        s.reset();
        assert_eq!(s.tracked(), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(StabilizerConfig::default().validate().is_ok());
        let bad = StabilizerConfig {
            window: 0,
            ..Default::default()
        };
        assert!(Stabilizer::new(bad).is_err());
        let bad = StabilizerConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(KinematicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_partial_toml() {
        let c: StabilizerConfig = toml::from_str("window = 8").unwrap();
        assert_eq!(c.window, 8);
        assert_eq!(c.max_low_confidence_frames, 3);
        assert_eq!(c.max_gap(), ms(500));
    }
}
