// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pipeline
//!
//! The orchestrator that turns camera frames into exercise-form feedback.
//!
//! The pipeline wires together:
//! - A `FrameQueue` from `frame-queue` (drop-oldest backpressure).
//! - A swappable `PoseEstimator` from `pose-model`.
//! - The `Stabilizer` and `AngleEngine` from `kinematics`.
//! - The `RuleEngine` and `TierScorer` from `form-rules`.
//!
//! and runs them as a single sequential cycle executor:
//!
//! ```text
//! capture ──on_frame──► FrameQueue ──► Pipeline::run ──► Snapshot (watch)
//!                                          │  ▲        └► PipelineEvent (broadcast)
//!                           request_model ─┘  └─ stop / fail_source
//! ```
//!
//! # Concurrency
//! Collaborators talk to the pipeline only through a cloneable
//! [`PipelineHandle`]. The executor owns the model and every piece of
//! per-cycle state, so hot-swaps happen strictly between cycles and the
//! tier is never mutated concurrently.

mod config;
mod error;
mod exercise;
mod handle;
mod metrics;
mod pipeline;
mod snapshot;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use exercise::ExerciseProfile;
pub use handle::PipelineHandle;
pub use metrics::PipelineMetrics;
pub use pipeline::{CycleOutcome, Pipeline, PipelineState, MODEL_SWAP_RULE_ID};
pub use snapshot::{PipelineEvent, Snapshot, StatusEvent};
