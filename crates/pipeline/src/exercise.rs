// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Exercise profiles: the angles to track and the rules to apply.

use crate::PipelineError;
use form_rules::{
    AngleWindow, Condition, FeedbackKind, Rule, RuleEngine, TrendDirection, DEFAULT_HISTORY,
};
use kinematics::{AngleDefinition, AngleEngine};
use pose_model::coco;

fn default_history() -> usize {
    DEFAULT_HISTORY
}

/// A named set of angle definitions and feedback rules.
///
/// Deserialized from the `[exercise]` table; defaults to [`ExerciseProfile::squat`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExerciseProfile {
    pub name: String,
    /// Cycles of angle history kept for rule evaluation.
    #[serde(default = "default_history")]
    pub history: usize,
    #[serde(default)]
    pub angles: Vec<AngleDefinition>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// The evaluators built from a profile.
pub(crate) struct Evaluators {
    pub angles: AngleEngine,
    pub rules: RuleEngine,
    pub window: AngleWindow,
}

impl ExerciseProfile {
    /// Bodyweight squat seen side-on.
    pub fn squat() -> Self {
        let below = |label: &str, threshold| Condition::CrossesBelow {
            label: label.into(),
            threshold,
        };
        Self {
            name: "squat".into(),
            history: DEFAULT_HISTORY,
            angles: vec![
                AngleDefinition::new("left_knee", coco::LEFT_HIP, coco::LEFT_KNEE, coco::LEFT_ANKLE),
                AngleDefinition::new(
                    "right_knee",
                    coco::RIGHT_HIP,
                    coco::RIGHT_KNEE,
                    coco::RIGHT_ANKLE,
                ),
                AngleDefinition::new("left_hip", coco::LEFT_SHOULDER, coco::LEFT_HIP, coco::LEFT_KNEE),
                AngleDefinition::new(
                    "right_hip",
                    coco::RIGHT_SHOULDER,
                    coco::RIGHT_HIP,
                    coco::RIGHT_KNEE,
                ),
            ],
            rules: vec![
                Rule::new(
                    "descending",
                    FeedbackKind::Info,
                    "Descending",
                    Condition::Trend {
                        label: "left_knee".into(),
                        direction: TrendDirection::Decreasing,
                        samples: 5,
                        min_change: 10.0,
                    },
                ),
                Rule::new("good-depth", FeedbackKind::Ok, "Good depth", below("left_knee", 95.0)),
                Rule::new(
                    "too-deep",
                    FeedbackKind::Warn,
                    "Too deep, stay in control at the bottom",
                    below("left_knee", 60.0),
                ),
                Rule::new(
                    "forward-lean",
                    FeedbackKind::Warn,
                    "Chest up, you are leaning forward",
                    below("left_hip", 70.0),
                ),
                Rule::new(
                    "uneven-knees",
                    FeedbackKind::Warn,
                    "Knees are bending unevenly",
                    Condition::Asymmetry {
                        left: "left_knee".into(),
                        right: "right_knee".into(),
                        max_difference: 15.0,
                    },
                ),
                Rule::new(
                    "lockout",
                    FeedbackKind::Ok,
                    "Full lockout",
                    Condition::CrossesAbove {
                        label: "left_knee".into(),
                        threshold: 165.0,
                    },
                ),
            ],
        }
    }

    /// Checks the profile builds: valid angles, rules referencing them.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.build().map(|_| ())
    }

    pub(crate) fn build(&self) -> Result<Evaluators, PipelineError> {
        if self.angles.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "exercise '{}' defines no angles",
                self.name
            )));
        }
        if self.history < 2 {
            return Err(PipelineError::ConfigError(
                "exercise.history must be at least 2".into(),
            ));
        }
        let angles = AngleEngine::new(self.angles.clone())?;
        let labels: Vec<&str> = angles.labels().collect();
        let rules = RuleEngine::new(self.rules.clone(), &labels, self.history)?;
        let window = AngleWindow::new(&labels, self.history);
        Ok(Evaluators {
            angles,
            rules,
            window,
        })
    }
}

impl Default for ExerciseProfile {
    fn default() -> Self {
        Self::squat()
    }
}
