// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Estimator registry: model selection by string id.

use crate::estimator::PoseEstimator;
use crate::{EstimatorError, ReplayEstimator, SyntheticSettings, SyntheticSquat};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Builds a fresh, not yet warmed-up estimator instance.
pub type EstimatorFactory = Box<dyn Fn() -> Box<dyn PoseEstimator> + Send + Sync>;

/// Maps model ids to estimator factories.
///
/// Each `create` call returns a new instance, so a model being swapped in
/// never shares state with the one being swapped out.
#[derive(Default)]
pub struct EstimatorRegistry {
    factories: BTreeMap<String, EstimatorFactory>,
}

impl EstimatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the synthetic backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("synthetic-squat", || {
            Box::new(SyntheticSquat::new("synthetic-squat", SyntheticSettings::clean()))
        });
        registry.register("synthetic-squat-noisy", || {
            Box::new(SyntheticSquat::new(
                "synthetic-squat-noisy",
                SyntheticSettings::noisy(),
            ))
        });
        registry
    }

    /// Registers the file-backed `replay` backend.
    pub fn register_replay(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.register("replay", move || {
            Box::new(ReplayEstimator::from_file("replay", path.clone()))
        });
    }

    /// Registers (or replaces) the factory for `id`.
    ///
    /// Returns `true` if an existing factory was replaced.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> Box<dyn PoseEstimator> + Send + Sync + 'static,
    {
        let id = id.into();
        tracing::debug!("registering pose estimator '{id}'");
        self.factories.insert(id, Box::new(factory)).is_some()
    }

    /// Creates a new instance of the model registered as `id`.
    pub fn create(&self, id: &str) -> Result<Box<dyn PoseEstimator>, EstimatorError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| EstimatorError::UnknownModel(id.to_string()))?;
        Ok(factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for EstimatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimatorRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
