// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline counters.
//!
//! [`PipelineMetrics`] is updated only by the cycle executor, so it needs no
//! synchronization; read it through [`Pipeline::metrics`](crate::Pipeline::metrics).

use std::time::Duration;

/// Aggregate counters for the lifetime of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PipelineMetrics {
    /// Cycles that produced a snapshot.
    pub cycles_completed: u64,
    /// Cycles dropped because the estimate exceeded the budget.
    pub inference_timeouts: u64,
    /// Cycles dropped because the estimator returned an error.
    pub inference_failures: u64,
    /// Frames skipped because they were not newer than the last one.
    pub stale_frames: u64,
    pub swaps_applied: u64,
    pub swaps_failed: u64,
    /// Number of estimates that finished within budget.
    pub inferences: u64,
    pub total_inference: Duration,
    pub max_inference: Duration,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_inference(&mut self, latency: Duration) {
        self.inferences += 1;
        self.total_inference += latency;
        if latency > self.max_inference {
            self.max_inference = latency;
        }
    }

    pub(crate) fn record_cycle(&mut self) {
        self.cycles_completed += 1;
    }

    pub(crate) fn record_timeout(&mut self) {
        self.inference_timeouts += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.inference_failures += 1;
    }

    pub(crate) fn record_stale(&mut self) {
        self.stale_frames += 1;
    }

    pub(crate) fn record_swap(&mut self, applied: bool) {
        if applied {
            self.swaps_applied += 1;
        } else {
            self.swaps_failed += 1;
        }
    }

    /// Mean latency of estimates that finished within budget.
    pub fn mean_inference(&self) -> Duration {
        if self.inferences == 0 {
            return Duration::ZERO;
        }
        self.total_inference / self.inferences as u32
    }

    /// Cycles dropped for any reason.
    pub fn dropped_cycles(&self) -> u64 {
        self.inference_timeouts + self.inference_failures
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Pipeline: {} cycles, {} timeouts, {} failures, {} stale, \
             swaps {}/{} ok, inference mean {:.2}ms max {:.2}ms",
            self.cycles_completed,
            self.inference_timeouts,
            self.inference_failures,
            self.stale_frames,
            self.swaps_applied,
            self.swaps_applied + self.swaps_failed,
            self.mean_inference().as_secs_f64() * 1000.0,
            self.max_inference.as_secs_f64() * 1000.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = PipelineMetrics::new();
        assert_eq!(m.mean_inference(), Duration::ZERO);
        assert_eq!(m.dropped_cycles(), 0);
    }

    #[test]
    fn test_latency_aggregation() {
        let mut m = PipelineMetrics::new();
        m.record_inference(Duration::from_millis(10));
        m.record_inference(Duration::from_millis(30));
        assert_eq!(m.inferences, 2);
        assert_eq!(m.total_inference, Duration::from_millis(40));
        assert_eq!(m.max_inference, Duration::from_millis(30));
        assert_eq!(m.mean_inference(), Duration::from_millis(20));
    }

    #[test]
    fn test_counters() {
        let mut m = PipelineMetrics::new();
        m.record_cycle();
        m.record_timeout();
        m.record_failure();
        m.record_stale();
        m.record_swap(true);
        m.record_swap(false);
        assert_eq!(m.cycles_completed, 1);
        assert_eq!(m.dropped_cycles(), 2);
        assert_eq!(m.stale_frames, 1);
        assert_eq!((m.swaps_applied, m.swaps_failed), (1, 1));
    }

    #[test]
    fn test_summary_format() {
        let mut m = PipelineMetrics::new();
        m.record_cycle();
        m.record_inference(Duration::from_millis(5));
        let s = m.summary();
        assert!(s.contains("Pipeline:"));
        assert!(s.contains("1 cycles"));
        assert!(s.contains("mean 5.00ms"));
    }
}
