// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rolling form-quality score and tier hysteresis.
//!
//! Each cycle contributes one [`CycleQuality`] to a fixed window. The score
//! blends the fraction of clean cycles (no `warn`/`error` feedback) with
//! the fraction of confident angle samples. The score maps to a candidate
//! [`Tier`]; [`apply_hysteresis`] decides whether the committed tier moves.

use crate::feedback::FeedbackEvent;
use crate::RuleError;
use kinematics::{AngleSample, Ring};
use std::fmt;
use std::time::Duration;

/// Form tier, ordered `None < Bronze < Silver < Gold`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// One step from `self` toward `target` (or `self` if equal).
    pub fn step_toward(self, target: Tier) -> Tier {
        use std::cmp::Ordering::*;
        match self.cmp(&target) {
            Less => self.up(),
            Greater => self.down(),
            Equal => self,
        }
    }

    fn up(self) -> Tier {
        match self {
            Tier::None => Tier::Bronze,
            Tier::Bronze => Tier::Silver,
            Tier::Silver | Tier::Gold => Tier::Gold,
        }
    }

    fn down(self) -> Tier {
        match self {
            Tier::Gold => Tier::Silver,
            Tier::Silver => Tier::Bronze,
            Tier::Bronze | Tier::None => Tier::None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::None => "none",
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
        })
    }
}

/// Scorer settings (`[scoring]` table of the pipeline config).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Cycles in the rolling window.
    pub window: usize,
    /// Angle samples at or above this confidence count as confident.
    pub confidence_threshold: f32,
    pub clean_weight: f32,
    pub confidence_weight: f32,
    pub bronze: f32,
    pub silver: f32,
    pub gold: f32,
    /// Consecutive cycles a candidate must persist before a commit.
    pub hysteresis_cycles: u32,
}

impl TierConfig {
    pub fn validate(&self) -> Result<(), RuleError> {
        let bad = |d: String| Err(RuleError::InvalidConfig(d));
        if self.window == 0 {
            return bad("scoring.window must be at least 1".into());
        }
        if self.hysteresis_cycles == 0 {
            return bad("scoring.hysteresis_cycles must be at least 1".into());
        }
        for (name, v) in [
            ("confidence_threshold", self.confidence_threshold),
            ("bronze", self.bronze),
            ("silver", self.silver),
            ("gold", self.gold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("scoring.{name} must be in [0, 1], got {v}"));
            }
        }
        if !(self.bronze <= self.silver && self.silver <= self.gold) {
            return bad("scoring thresholds must satisfy bronze <= silver <= gold".into());
        }
        let weights_ok = |w: f32| w.is_finite() && w >= 0.0;
        if !weights_ok(self.clean_weight)
            || !weights_ok(self.confidence_weight)
            || self.clean_weight + self.confidence_weight <= 0.0
        {
            return bad("scoring weights must be non-negative with a positive sum".into());
        }
        Ok(())
    }

    /// Maps a score in `[0, 1]` to the highest tier whose threshold it meets.
    pub fn tier_for(&self, score: f32) -> Tier {
        if score >= self.gold {
            Tier::Gold
        } else if score >= self.silver {
            Tier::Silver
        } else if score >= self.bronze {
            Tier::Bronze
        } else {
            Tier::None
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            window: 30,
            confidence_threshold: 0.5,
            clean_weight: 0.6,
            confidence_weight: 0.4,
            bronze: 0.5,
            silver: 0.7,
            gold: 0.9,
            hysteresis_cycles: 3,
        }
    }
}

/// Committed tier plus the hysteresis bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TierState {
    pub tier: Tier,
    pub score: f32,
    /// Frame time of the last commit.
    pub last_changed_at: Option<Duration>,
    pub candidate: Tier,
    pub consecutive_frames_at_candidate: u32,
}

/// Advances the hysteresis by one cycle.
///
/// A candidate different from the committed tier must be observed for
/// `hysteresis` consecutive cycles; then the tier moves one step toward it
/// and the counter restarts. Seeing the committed tier clears the counter.
pub fn apply_hysteresis(
    state: &TierState,
    candidate: Tier,
    score: f32,
    now: Duration,
    hysteresis: u32,
) -> TierState {
    let mut next = TierState {
        score,
        candidate,
        ..state.clone()
    };
    if candidate == state.tier {
        next.consecutive_frames_at_candidate = 0;
        return next;
    }
    next.consecutive_frames_at_candidate = if candidate == state.candidate {
        state.consecutive_frames_at_candidate.saturating_add(1)
    } else {
        1
    };
    if next.consecutive_frames_at_candidate >= hysteresis {
        next.tier = state.tier.step_toward(candidate);
        next.last_changed_at = Some(now);
        next.consecutive_frames_at_candidate = 0;
    }
    next
}

/// Quality summary of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleQuality {
    /// At least one angle was measured and no `warn` or `error` fired.
    pub clean: bool,
    pub confident_samples: usize,
    pub total_samples: usize,
}

impl CycleQuality {
    pub fn assess(feedback: &[FeedbackEvent], angles: &[AngleSample], threshold: f32) -> Self {
        Self {
            // A cycle without angles is never clean.
            clean: !angles.is_empty() && !feedback.iter().any(|e| e.kind.is_problem()),
            confident_samples: angles.iter().filter(|a| a.confidence >= threshold).count(),
            total_samples: angles.len(),
        }
    }
}

/// Rolling scorer that owns the [`TierState`].
pub struct TierScorer {
    config: TierConfig,
    window: Ring<CycleQuality>,
    state: TierState,
}

impl TierScorer {
    pub fn new(config: TierConfig) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self {
            window: Ring::new(config.window),
            config,
            state: TierState::default(),
        })
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn state(&self) -> &TierState {
        &self.state
    }

    /// Records one completed cycle and returns the updated state.
    pub fn record(
        &mut self,
        feedback: &[FeedbackEvent],
        angles: &[AngleSample],
        now: Duration,
    ) -> &TierState {
        self.window.push(CycleQuality::assess(
            feedback,
            angles,
            self.config.confidence_threshold,
        ));
        let score = self.score();
        let candidate = self.config.tier_for(score);
        let previous = self.state.tier;
        self.state = apply_hysteresis(
            &self.state,
            candidate,
            score,
            now,
            self.config.hysteresis_cycles,
        );
        if self.state.tier != previous {
            tracing::info!(from = %previous, to = %self.state.tier, score, "tier changed");
        }
        &self.state
    }

    /// Weighted score over the current window, in `[0, 1]`.
    pub fn score(&self) -> f32 {
        let cycles = self.window.len();
        if cycles == 0 {
            return 0.0;
        }
        let clean = self.window.iter().filter(|q| q.clean).count() as f32 / cycles as f32;
        let (confident, total) = self.window.iter().fold((0usize, 0usize), |(c, t), q| {
            (c + q.confident_samples, t + q.total_samples)
        });
        let confident = if total == 0 {
            0.0
        } else {
            confident as f32 / total as f32
        };
        let weights = self.config.clean_weight + self.config.confidence_weight;
        (self.config.clean_weight * clean + self.config.confidence_weight * confident) / weights
    }

    /// Back to `Tier::None` with an empty window.
    pub fn reset(&mut self) {
        self.window.clear();
        self.state = TierState::default();
    }
}

impl fmt::Debug for TierScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierScorer")
            .field("tier", &self.state.tier)
            .field("score", &self.state.score)
            .field("cycles", &self.window.len())
            .finish()
    }
}
