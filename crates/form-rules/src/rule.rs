// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rule definitions and their conditions.
//!
//! A [`Condition`] is a pure predicate over an [`AngleWindow`]. It yields
//! `None` when the window lacks the samples it needs, which the engine
//! treats as "skip this rule for this cycle".

use crate::feedback::FeedbackKind;
use crate::window::AngleWindow;
use crate::RuleError;

/// Direction of a [`Condition::Trend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

fn default_trend_samples() -> usize {
    5
}

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Previous value ≥ threshold and current value < threshold.
    CrossesBelow { label: String, threshold: f32 },
    /// Previous value ≤ threshold and current value > threshold.
    CrossesAbove { label: String, threshold: f32 },
    /// Current value within `[min, max]`.
    Within { label: String, min: f32, max: f32 },
    /// Current value outside `[min, max]`.
    Outside { label: String, min: f32, max: f32 },
    /// The last `samples` values move strictly in `direction` by at least
    /// `min_change` in total. Fires on the first cycle this becomes true.
    Trend {
        label: String,
        direction: TrendDirection,
        #[serde(default = "default_trend_samples")]
        samples: usize,
        #[serde(default)]
        min_change: f32,
    },
    /// `|left - right|` rises above `max_difference`.
    Asymmetry {
        left: String,
        right: String,
        max_difference: f32,
    },
}

impl Condition {
    /// Angle labels this condition reads.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::CrossesBelow { label, .. }
            | Self::CrossesAbove { label, .. }
            | Self::Within { label, .. }
            | Self::Outside { label, .. }
            | Self::Trend { label, .. } => vec![label.as_str()],
            Self::Asymmetry { left, right, .. } => vec![left.as_str(), right.as_str()],
        }
    }

    /// Cycles of history needed to evaluate, including the current one.
    pub fn history_needed(&self) -> usize {
        match self {
            Self::CrossesBelow { .. } | Self::CrossesAbove { .. } | Self::Asymmetry { .. } => 2,
            Self::Within { .. } | Self::Outside { .. } => 1,
            Self::Trend { samples, .. } => samples + 1,
        }
    }

    /// Checks numeric parameters.
    pub fn validate(&self, rule_id: &str) -> Result<(), RuleError> {
        let invalid = |detail: String| RuleError::InvalidRule {
            rule_id: rule_id.to_string(),
            detail,
        };
        let angle = |name: &str, v: f32| {
            if v.is_finite() && (0.0..=180.0).contains(&v) {
                Ok(())
            } else {
                Err(invalid(format!("{name} must be within [0, 180], got {v}")))
            }
        };
        match self {
            Self::CrossesBelow { threshold, .. } | Self::CrossesAbove { threshold, .. } => {
                angle("threshold", *threshold)
            }
            Self::Within { min, max, .. } | Self::Outside { min, max, .. } => {
                angle("min", *min)?;
                angle("max", *max)?;
                if min >= max {
                    return Err(invalid(format!("min ({min}) must be below max ({max})")));
                }
                Ok(())
            }
            Self::Trend {
                samples,
                min_change,
                ..
            } => {
                if *samples < 2 {
                    return Err(invalid(format!("samples must be at least 2, got {samples}")));
                }
                if !min_change.is_finite() || *min_change < 0.0 {
                    return Err(invalid(format!(
                        "min_change must be non-negative, got {min_change}"
                    )));
                }
                Ok(())
            }
            Self::Asymmetry {
                left,
                right,
                max_difference,
            } => {
                if left == right {
                    return Err(invalid("left and right must be different angles".into()));
                }
                if !max_difference.is_finite() || *max_difference <= 0.0 {
                    return Err(invalid(format!(
                        "max_difference must be positive, got {max_difference}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Evaluates against the window; `None` if it cannot be decided.
    pub fn evaluate(&self, window: &AngleWindow) -> Option<bool> {
        match self {
            Self::CrossesBelow { label, threshold } => {
                let prev = window.value(label, 1)?;
                let cur = window.value(label, 0)?;
                Some(prev >= *threshold && cur < *threshold)
            }
            Self::CrossesAbove { label, threshold } => {
                let prev = window.value(label, 1)?;
                let cur = window.value(label, 0)?;
                Some(prev <= *threshold && cur > *threshold)
            }
            Self::Within { label, min, max } => {
                let cur = window.value(label, 0)?;
                Some((*min..=*max).contains(&cur))
            }
            Self::Outside { label, min, max } => {
                let cur = window.value(label, 0)?;
                Some(cur < *min || cur > *max)
            }
            Self::Trend {
                label,
                direction,
                samples,
                min_change,
            } => {
                let now = window.recent(label, *samples, 0)?;
                if !is_trend(&now, *direction, *min_change) {
                    return Some(false);
                }
                let before = window
                    .recent(label, *samples, 1)
                    .is_some_and(|v| is_trend(&v, *direction, *min_change));
                Some(!before)
            }
            Self::Asymmetry {
                left,
                right,
                max_difference,
            } => {
                let cur = (window.value(left, 0)? - window.value(right, 0)?).abs();
                let prev = (window.value(left, 1)? - window.value(right, 1)?).abs();
                Some(prev <= *max_difference && cur > *max_difference)
            }
        }
    }
}

fn is_trend(values: &[f32], direction: TrendDirection, min_change: f32) -> bool {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return false;
    };
    let monotonic = values.windows(2).all(|w| match direction {
        TrendDirection::Increasing => w[1] > w[0],
        TrendDirection::Decreasing => w[1] < w[0],
    });
    monotonic && (last - first).abs() >= min_change
}

/// A feedback rule: emit `text` at `kind` whenever `condition` holds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    pub id: String,
    pub kind: FeedbackKind,
    pub text: String,
    pub condition: Condition,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        kind: FeedbackKind,
        text: impl Into<String>,
        condition: Condition,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            condition,
        }
    }
}
