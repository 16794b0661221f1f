// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! What the pipeline publishes.

use form_rules::{FeedbackEvent, TierState};
use kinematics::AngleSample;
use std::sync::Arc;
use std::time::Duration;

/// The pipeline's output after one completed cycle.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Snapshot {
    /// 1-based count of completed cycles since creation or reset.
    pub cycle: u64,
    pub frame_timestamp: Duration,
    /// Model that produced this cycle's estimate.
    pub model_id: String,
    /// Angles computed this cycle, in definition order.
    pub angles: Vec<AngleSample>,
    /// Feedback appended to the history during this cycle.
    pub new_feedback: Vec<FeedbackEvent>,
    /// Bounded feedback history, oldest first.
    pub feedback: Vec<FeedbackEvent>,
    pub tier: TierState,
}

impl Snapshot {
    pub fn angle(&self, label: &str) -> Option<&AngleSample> {
        self.angles.iter().find(|a| a.label == label)
    }
}

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusEvent {
    Started { model_id: String },
    Stopped,
    ModelSwapped { from: String, to: String },
    ModelSwapFailed { model_id: String, reason: String },
    /// Emitted exactly once when the pipeline moves to `Failed`.
    Fatal { error: String },
}

/// Everything sent on the [`subscribe`](crate::PipelineHandle::subscribe) stream.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Snapshot(Arc<Snapshot>),
    Status(StatusEvent),
}
