// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for pose estimation backends.

use std::time::Duration;

/// Errors that can occur while loading or running a pose estimator.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// `estimate` did not finish within its time budget.
    #[error("inference on model '{model_id}' exceeded its {budget:?} budget")]
    InferenceTimeout { model_id: String, budget: Duration },

    /// The backend failed while processing a frame.
    #[error("inference failed on model '{model_id}': {detail}")]
    Inference { model_id: String, detail: String },

    /// The backend could not be loaded or warmed up.
    #[error("failed to load model '{model_id}': {detail}")]
    ModelLoad { model_id: String, detail: String },

    /// No factory is registered under the requested id.
    #[error("no pose estimator registered as '{0}'")]
    UnknownModel(String),

    /// `estimate` was called before a successful `warm_up`, or after `dispose`.
    #[error("model '{0}' is not warmed up")]
    NotReady(String),

    /// A replay recording could not be read.
    #[error("failed to read replay file {path}: {source}")]
    Replay {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
