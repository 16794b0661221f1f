// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Keypoint playback.
//!
//! [`ReplayEstimator`] hands back pre-recorded keypoint sets in order, one
//! per `estimate` call, re-tagged with the current frame's timestamp. The
//! recording is either held in memory or loaded from a JSON-Lines file
//! during `warm_up`:
//!
//! ```text
//! [{"id":11,"x":0.46,"y":0.50,"confidence":0.93}, {"id":13,"x":0.49,"y":0.70,"confidence":0.91}]
//! [{"id":11,"x":0.45,"y":0.51,"confidence":0.92}, {"id":13,"x":0.49,"y":0.70,"confidence":0.90}]
//! ```
//!
//! Blank lines are ignored. When the recording is exhausted the estimator
//! either loops or returns empty estimates.

use crate::estimator::PoseEstimator;
use crate::{EstimatorError, Keypoint, PoseEstimate};
use frame_queue::Frame;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum ReplaySource {
    Memory(Vec<Vec<Keypoint>>),
    File(PathBuf),
}

/// Plays back recorded keypoints.
pub struct ReplayEstimator {
    model_id: String,
    source: ReplaySource,
    poses: Vec<Vec<Keypoint>>,
    cursor: usize,
    looping: bool,
    ready: bool,
}

impl ReplayEstimator {
    /// Replays `poses` from memory.
    pub fn from_poses(model_id: impl Into<String>, poses: Vec<Vec<Keypoint>>) -> Self {
        Self::with_source(model_id.into(), ReplaySource::Memory(poses))
    }

    /// Replays a JSON-Lines recording, read during `warm_up`.
    pub fn from_file(model_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_source(model_id.into(), ReplaySource::File(path.into()))
    }

    fn with_source(model_id: String, source: ReplaySource) -> Self {
        Self {
            model_id,
            source,
            poses: Vec::new(),
            cursor: 0,
            looping: true,
            ready: false,
        }
    }

    /// Whether playback wraps around at the end (default `true`).
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of recorded poses (available after `warm_up` for files).
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Whether the recording is backed by a file.
    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, ReplaySource::File(_))
    }
}

/// Reads and parses a recording without blocking the executor.
async fn load_file(model_id: &str, path: &Path) -> Result<Vec<Vec<Keypoint>>, EstimatorError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EstimatorError::Replay {
            path: path.display().to_string(),
            source: e,
        })?;
    parse_recording(&content).map_err(|detail| EstimatorError::ModelLoad {
        model_id: model_id.to_string(),
        detail: format!("{}: {detail}", path.display()),
    })
}

/// Parses a JSON-Lines recording into one keypoint set per non-blank line.
pub fn parse_recording(content: &str) -> Result<Vec<Vec<Keypoint>>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Vec<Keypoint>>(line).map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

#[async_trait::async_trait]
impl PoseEstimator for ReplayEstimator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn warm_up(&mut self) -> Result<(), EstimatorError> {
        let poses = match &self.source {
            ReplaySource::Memory(poses) => poses.clone(),
            ReplaySource::File(path) => {
                let path = path.clone();
                load_file(&self.model_id, &path).await?
            }
        };
        if poses.is_empty() {
            return Err(EstimatorError::ModelLoad {
                model_id: self.model_id.clone(),
                detail: "recording contains no poses".into(),
            });
        }
        tracing::debug!("replay model '{}' loaded {} poses", self.model_id, poses.len());
        self.poses = poses;
        self.cursor = 0;
        self.ready = true;
        Ok(())
    }

    async fn estimate(&mut self, frame: &Frame) -> Result<PoseEstimate, EstimatorError> {
        if !self.ready {
            return Err(EstimatorError::NotReady(self.model_id.clone()));
        }

        if self.cursor >= self.poses.len() {
            if !self.looping {
                return Ok(PoseEstimate::empty(frame.timestamp(), self.model_id.clone()));
            }
            self.cursor = 0;
        }

        let keypoints = self.poses[self.cursor].clone();
        self.cursor += 1;
        Ok(PoseEstimate::new(frame.timestamp(), self.model_id.clone(), keypoints))
    }

    fn dispose(&mut self) {
        self.ready = false;
        self.poses.clear();
    }
}
