// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Procedural squat motion.
//!
//! [`SyntheticSquat`] needs no model weights: it derives a full 17-point
//! COCO skeleton from the frame timestamp. The knee and hip angles follow
//! a cosine between a standing and a bottom position, so downstream stages
//! see realistic, exactly known joint angles.
//!
//! The noisy preset adds deterministic jitter and periodic low-confidence
//! dropouts of the distal keypoints (wrists, ankles), which is what a real
//! lightweight model tends to produce under motion blur.

use crate::estimator::PoseEstimator;
use crate::{coco, EstimatorError, Keypoint, PoseEstimate};
use frame_queue::Frame;
use std::f32::consts::PI;
use std::time::Duration;

const SHIN: f32 = 0.20;
const THIGH: f32 = 0.20;
const TORSO: f32 = 0.28;
const UPPER_ARM: f32 = 0.12;
const FOREARM: f32 = 0.11;
const ANKLE_Y: f32 = 0.90;

/// Tuning for [`SyntheticSquat`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSettings {
    /// Duration of one full rep (stand → bottom → stand).
    pub rep_period: Duration,
    pub standing_knee_deg: f32,
    pub bottom_knee_deg: f32,
    pub standing_hip_deg: f32,
    pub bottom_hip_deg: f32,
    /// Artificial inference latency per `estimate` call.
    pub latency: Duration,
    /// Maximum positional jitter (normalized units) added to every keypoint.
    pub jitter: f32,
    /// Every n-th frame the wrists and ankles drop to low confidence.
    pub dropout_every: Option<u32>,
    /// Seed for the jitter generator; reset on every warm-up.
    pub seed: u64,
}

impl SyntheticSettings {
    /// Clean motion, no latency.
    pub fn clean() -> Self {
        Self {
            rep_period: Duration::from_secs(2),
            standing_knee_deg: 172.0,
            bottom_knee_deg: 85.0,
            standing_hip_deg: 175.0,
            bottom_hip_deg: 75.0,
            latency: Duration::ZERO,
            jitter: 0.0,
            dropout_every: None,
            seed: 0x9e37_79b9_7f4a_7c15,
        }
    }

    /// Jittery motion with a distal dropout every 7th frame.
    pub fn noisy() -> Self {
        Self {
            jitter: 0.004,
            dropout_every: Some(7),
            ..Self::clean()
        }
    }
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self::clean()
    }
}

/// A pose estimator that synthesizes a squatting subject.
pub struct SyntheticSquat {
    model_id: String,
    settings: SyntheticSettings,
    ready: bool,
    rng: u64,
    frames_seen: u64,
}

impl SyntheticSquat {
    pub fn new(model_id: impl Into<String>, settings: SyntheticSettings) -> Self {
        Self {
            model_id: model_id.into(),
            rng: settings.seed,
            settings,
            ready: false,
            frames_seen: 0,
        }
    }

    /// Knee and hip angle (degrees) at `t` on the capture clock.
    pub fn angles_at(&self, t: Duration) -> (f32, f32) {
        let s = &self.settings;
        let period = s.rep_period.as_secs_f32().max(1e-3);
        let cycle = (t.as_secs_f32() % period) / period;
        // 0 at standing, 1 at the bottom of the rep.
        let depth = (1.0 - (2.0 * PI * cycle).cos()) / 2.0;
        let knee = s.standing_knee_deg + (s.bottom_knee_deg - s.standing_knee_deg) * depth;
        let hip = s.standing_hip_deg + (s.bottom_hip_deg - s.standing_hip_deg) * depth;
        (knee, hip)
    }

    /// xorshift64*; deterministic and dependency-free.
    fn next_noise(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng = x;
        let unit = (x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 40) as f32 / (1u64 << 24) as f32;
        (unit * 2.0 - 1.0) * self.settings.jitter
    }
}

#[async_trait::async_trait]
impl PoseEstimator for SyntheticSquat {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn warm_up(&mut self) -> Result<(), EstimatorError> {
        self.rng = self.settings.seed;
        self.frames_seen = 0;
        self.ready = true;
        tracing::debug!("synthetic model '{}' warmed up", self.model_id);
        Ok(())
    }

    async fn estimate(&mut self, frame: &Frame) -> Result<PoseEstimate, EstimatorError> {
        if !self.ready {
            return Err(EstimatorError::NotReady(self.model_id.clone()));
        }
        if !self.settings.latency.is_zero() {
            tokio::time::sleep(self.settings.latency).await;
        }

        self.frames_seen += 1;
        let (knee, hip) = self.angles_at(frame.timestamp());
        let mut keypoints = squat_keypoints(knee, hip);

        if self.settings.jitter > 0.0 {
            for kp in &mut keypoints {
                kp.x += self.next_noise();
                kp.y += self.next_noise();
            }
        }

        if let Some(every) = self.settings.dropout_every {
            if every > 0 && self.frames_seen % every as u64 == 0 {
                for kp in &mut keypoints {
                    if matches!(
                        kp.id,
                        coco::LEFT_WRIST | coco::RIGHT_WRIST | coco::LEFT_ANKLE | coco::RIGHT_ANKLE
                    ) {
                        kp.confidence = 0.1;
                    }
                }
            }
        }

        Ok(PoseEstimate::new(frame.timestamp(), self.model_id.clone(), keypoints))
    }

    fn dispose(&mut self) {
        self.ready = false;
    }
}

/// Builds a side-on 17-point skeleton with the given knee and hip angles.
///
/// The knee angle is measured at the knee between hip and ankle; the hip
/// angle at the hip between shoulder and knee. Both legs share the same
/// angles. All keypoints have confidence `0.95`.
pub fn squat_keypoints(knee_deg: f32, hip_deg: f32) -> Vec<Keypoint> {
    let knee_rad = knee_deg.to_radians();
    let hip_rad = hip_deg.to_radians();

    let side = |base_x: f32| {
        let ankle = (base_x, ANKLE_Y);
        let knee = (base_x, ANKLE_Y - SHIN);
        // Rotate the knee→ankle direction (straight down) by the knee angle.
        let thigh_dir = (-knee_rad.sin(), knee_rad.cos());
        let hip = (knee.0 + THIGH * thigh_dir.0, knee.1 + THIGH * thigh_dir.1);
        // Rotate the hip→knee direction by the hip angle, towards the head.
        let w = (-thigh_dir.0, -thigh_dir.1);
        let torso_dir = (
            w.0 * hip_rad.cos() + w.1 * hip_rad.sin(),
            -w.0 * hip_rad.sin() + w.1 * hip_rad.cos(),
        );
        let shoulder = (hip.0 + TORSO * torso_dir.0, hip.1 + TORSO * torso_dir.1);
        let elbow = (shoulder.0 + UPPER_ARM, shoulder.1);
        let wrist = (elbow.0 + FOREARM, elbow.1);
        (shoulder, elbow, wrist, hip, knee, ankle)
    };

    let (ls, le, lw, lh, lk, la) = side(0.49);
    let (rs, re, rw, rh, rk, ra) = side(0.51);
    let nose = ((ls.0 + rs.0) / 2.0 + 0.03, (ls.1 + rs.1) / 2.0 - 0.10);

    let kp = |id, (x, y): (f32, f32)| Keypoint::new(id, x, y, 0.95);
    vec![
        kp(coco::NOSE, nose),
        kp(coco::LEFT_EYE, (nose.0 - 0.01, nose.1 - 0.015)),
        kp(coco::RIGHT_EYE, (nose.0 + 0.01, nose.1 - 0.015)),
        kp(coco::LEFT_EAR, (nose.0 - 0.03, nose.1)),
        kp(coco::RIGHT_EAR, (nose.0 + 0.01, nose.1)),
        kp(coco::LEFT_SHOULDER, ls),
        kp(coco::RIGHT_SHOULDER, rs),
        kp(coco::LEFT_ELBOW, le),
        kp(coco::RIGHT_ELBOW, re),
        kp(coco::LEFT_WRIST, lw),
        kp(coco::RIGHT_WRIST, rw),
        kp(coco::LEFT_HIP, lh),
        kp(coco::RIGHT_HIP, rh),
        kp(coco::LEFT_KNEE, lk),
        kp(coco::RIGHT_KNEE, rk),
        kp(coco::LEFT_ANKLE, la),
        kp(coco::RIGHT_ANKLE, ra),
    ]
}
