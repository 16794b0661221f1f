// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model = "synthetic-squat"
//! queue_capacity = 2
//! inference_timeout_ms = 100
//! warmup_timeout_ms = 2000
//! feedback_history = 50
//! replay_path = "session.jsonl"
//!
//! [stabilizer]
//! window = 5
//! min_confidence = 0.3
//!
//! [scoring]
//! hysteresis_cycles = 3
//!
//! [exercise]
//! name = "squat"
//!
//! [[exercise.angles]]
//! label = "left_knee"
//! joints = [11, 13, 15]
//! ```
//!
//! Every key is optional. Missing tables fall back to their defaults and a
//! missing `[exercise]` table selects the built-in squat profile.

use crate::{ExerciseProfile, PipelineError};
use form_rules::TierConfig;
use kinematics::StabilizerConfig;
use pose_model::EstimatorRegistry;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Estimator id started with the pipeline.
    #[serde(default = "default_model")]
    pub model: String,
    /// Frames buffered between capture and the cycle executor.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Budget for a single `estimate` call.
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,
    /// Budget for warming up a model, on start and on hot-swap.
    #[serde(default = "default_warmup_timeout_ms")]
    pub warmup_timeout_ms: u64,
    /// Feedback events retained in the history.
    #[serde(default = "default_feedback_history")]
    pub feedback_history: usize,
    /// JSON-Lines keypoint recording; registers the `replay` model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_path: Option<PathBuf>,
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
    #[serde(default)]
    pub scoring: TierConfig,
    #[serde(default)]
    pub exercise: ExerciseProfile,
}

fn default_model() -> String {
    "synthetic-squat".to_string()
}

fn default_queue_capacity() -> usize {
    frame_queue::DEFAULT_CAPACITY
}

fn default_inference_timeout_ms() -> u64 {
    100
}

fn default_warmup_timeout_ms() -> u64 {
    2000
}

fn default_feedback_history() -> usize {
    50
}

impl PipelineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml_str)
            .map_err(|e| PipelineError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::ConfigError(format!("TOML serialise error: {e}")))
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }

    /// Checks every numeric range and the exercise profile.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let bad = |d: &str| Err(PipelineError::ConfigError(d.to_string()));
        if self.model.trim().is_empty() {
            return bad("model must not be empty");
        }
        if self.queue_capacity == 0 {
            return bad("queue_capacity must be at least 1");
        }
        if self.inference_timeout_ms == 0 {
            return bad("inference_timeout_ms must be positive");
        }
        if self.warmup_timeout_ms == 0 {
            return bad("warmup_timeout_ms must be positive");
        }
        if self.feedback_history == 0 {
            return bad("feedback_history must be at least 1");
        }
        self.stabilizer.validate()?;
        self.scoring.validate()?;
        self.exercise.validate()
    }

    /// Builds the estimator registry this config can select from.
    pub fn create_registry(&self) -> EstimatorRegistry {
        let mut registry = EstimatorRegistry::with_builtins();
        if let Some(path) = &self.replay_path {
            registry.register_replay(path.clone());
        }
        registry
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            queue_capacity: default_queue_capacity(),
            inference_timeout_ms: default_inference_timeout_ms(),
            warmup_timeout_ms: default_warmup_timeout_ms(),
            feedback_history: default_feedback_history(),
            replay_path: None,
            stabilizer: StabilizerConfig::default(),
            scoring: TierConfig::default(),
            exercise: ExerciseProfile::default(),
        }
    }
}
