// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the pipeline orchestrator.

use pose_model::EstimatorError;

/// Errors surfaced by [`Pipeline`](crate::Pipeline).
///
/// Per-cycle problems (inference timeouts, estimator errors, partial poses)
/// never appear here; they are absorbed, logged and counted in
/// [`PipelineMetrics`](crate::PipelineMetrics).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The capture collaborator reported an unrecoverable failure.
    #[error("frame source failed: {0}")]
    FrameSourceFailure(String),

    /// No model could be loaded and there is no previous model to fall back on.
    #[error("model load failed: {0}")]
    ModelLoadFailure(#[source] EstimatorError),

    /// `start` was called on a pipeline that is already running.
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// The pipeline hit a fatal error and must be `reset` before reuse.
    #[error("pipeline has failed; reset it before running again")]
    Terminated,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("queue error: {0}")]
    Queue(#[from] frame_queue::QueueError),

    #[error("kinematics error: {0}")]
    Kinematics(#[from] kinematics::KinematicsError),

    #[error("rule error: {0}")]
    Rules(#[from] form_rules::RuleError),
}
