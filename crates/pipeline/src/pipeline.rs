// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The cycle executor.
//!
//! ```text
//!            run()                     stop()
//!   Idle ───────────► Running ───────────────► Stopped
//!                        │   ◄───────────────     │
//!                        │        run()           │
//!                        │ fatal                  │
//!                        ▼                        │
//!                      Failed ◄───── reset() ─────┘ (back to Idle)
//! ```
//!
//! One cycle:
//!
//! ```text
//! pop frame ─► stale? ─► apply pending swap ─► estimate (bounded)
//!     ─► stabilize ─► angles ─► rules ─► tier ─► publish snapshot
//! ```
//!
//! [`Pipeline::run`] takes `&mut self`, so two cycles can never overlap and
//! the model, stabilizer, window and tier are only touched from here.

use crate::exercise::Evaluators;
use crate::handle::Control;
use crate::{
    PipelineConfig, PipelineError, PipelineHandle, PipelineMetrics, Snapshot, StatusEvent,
};
use form_rules::{
    AngleWindow, FeedbackEvent, FeedbackKind, FeedbackLog, RuleEngine, TierScorer, TierState,
};
use frame_queue::{Frame, FrameQueue, QueueStats};
use kinematics::{AngleEngine, Stabilizer};
use pose_model::{EstimatorError, EstimatorRegistry, PoseEstimator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Rule id attached to feedback about failed model swaps.
pub const MODEL_SWAP_RULE_ID: &str = "model-swap";

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopped,
    Failed,
}

/// What happened to one dequeued frame.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(Arc<Snapshot>),
    /// Not newer than the last processed frame.
    Stale,
    /// The estimate exceeded the inference budget.
    TimedOut,
    /// The estimator returned an error.
    InferenceFailed,
}

/// The real-time form-analysis pipeline.
///
/// # Example
/// ```no_run
/// use pipeline::{Pipeline, PipelineConfig};
///
/// # async fn example() -> Result<(), pipeline::PipelineError> {
/// let mut pipeline = Pipeline::new(PipelineConfig::default())?;
/// let handle = pipeline.handle();
/// // hand `handle` to the capture task, then:
/// pipeline.run().await?;
/// println!("{}", pipeline.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    registry: EstimatorRegistry,
    control: Arc<Control>,
    state: PipelineState,
    model: Option<Box<dyn PoseEstimator>>,
    stabilizer: Stabilizer,
    angles: AngleEngine,
    window: AngleWindow,
    rules: RuleEngine,
    scorer: TierScorer,
    feedback: FeedbackLog,
    metrics: PipelineMetrics,
    cycle: u64,
    last_frame: Option<Duration>,
    /// Consecutive stale frames since the last accepted one.
    stale_streak: u64,
}

impl Pipeline {
    /// Creates a pipeline using the estimators `config` can select.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let registry = config.create_registry();
        Self::with_registry(config, registry)
    }

    /// Creates a pipeline with a caller-supplied estimator registry.
    pub fn with_registry(
        config: PipelineConfig,
        registry: EstimatorRegistry,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let Evaluators {
            angles,
            rules,
            window,
        } = config.exercise.build()?;
        let queue = FrameQueue::new(config.queue_capacity)?;
        tracing::info!(
            "pipeline created: exercise '{}', {} angles, {} rules, model '{}'",
            config.exercise.name,
            angles.definitions().len(),
            rules.len(),
            config.model,
        );
        Ok(Self {
            stabilizer: Stabilizer::new(config.stabilizer.clone())?,
            scorer: TierScorer::new(config.scoring.clone())?,
            feedback: FeedbackLog::new(config.feedback_history),
            control: Arc::new(Control::new(queue)),
            state: PipelineState::Idle,
            model: None,
            angles,
            window,
            rules,
            metrics: PipelineMetrics::new(),
            cycle: 0,
            last_frame: None,
            stale_streak: 0,
            registry,
            config,
        })
    }

    /// A handle for collaborators. Frames offered before the first `run`
    /// are buffered (subject to drop-oldest).
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle::new(self.control.clone())
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn tier(&self) -> &TierState {
        self.scorer.state()
    }

    pub fn feedback(&self) -> &FeedbackLog {
        &self.feedback
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.control.queue.stats()
    }

    /// Id of the active model, if one is loaded.
    pub fn active_model(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.model_id())
    }

    /// Starts the pipeline and processes frames until stopped or failed.
    ///
    /// Returns `Ok(())` after a stop, or the fatal error after moving to
    /// [`PipelineState::Failed`]. A stopped pipeline can be run again.
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        if self.state == PipelineState::Failed {
            return Err(PipelineError::Terminated);
        }
        if self.state == PipelineState::Stopped {
            // A restart only honours stops issued after it starts.
            self.control.take_stop();
        } else if self.control.take_stop() {
            tracing::info!("stop requested before start");
            self.finish_stop();
            return Ok(());
        }
        self.start().await?;

        loop {
            if let Some(reason) = self.control.take_source_failure() {
                return Err(self.fail(PipelineError::FrameSourceFailure(reason)));
            }
            if self.control.stop_requested() {
                break;
            }
            match self.control.queue.pop().await {
                Some(frame) => {
                    self.process_frame(frame).await?;
                }
                None if self.control.has_pending_signal() => continue,
                None => break,
            }
        }

        self.control.take_stop();
        self.finish_stop();
        Ok(())
    }

    /// Loads the model if needed and moves to `Running`.
    ///
    /// [`run`](Self::run) calls this; use it directly together with
    /// [`process_frame`](Self::process_frame) to drive cycles by hand.
    pub async fn start(&mut self) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Running => return Err(PipelineError::AlreadyRunning),
            PipelineState::Failed => return Err(PipelineError::Terminated),
            PipelineState::Idle | PipelineState::Stopped => {}
        }
        if let Some(reason) = self.control.take_source_failure() {
            return Err(self.fail(PipelineError::FrameSourceFailure(reason)));
        }

        if self.model.is_none() {
            let model_id = self
                .control
                .take_swap_request()
                .unwrap_or_else(|| self.config.model.clone());
            match load_model(&self.registry, &model_id, self.config.warmup_timeout()).await {
                Ok(model) => self.model = Some(model),
                Err(e) => return Err(self.fail(PipelineError::ModelLoadFailure(e))),
            }
        }

        self.stabilizer.reset();
        self.window.clear();
        self.last_frame = None;
        self.stale_streak = 0;
        self.control.queue.reopen();
        self.state = PipelineState::Running;

        let model_id = self.active_model().unwrap_or_default().to_string();
        tracing::info!("pipeline started with model '{model_id}'");
        self.control.emit(StatusEvent::Started { model_id });
        Ok(())
    }

    /// Runs one cycle on `frame`.
    ///
    /// Per-cycle failures are absorbed and reported through the returned
    /// [`CycleOutcome`]; only a missing model is an error.
    pub async fn process_frame(&mut self, frame: Frame) -> Result<CycleOutcome, PipelineError> {
        let ts = frame.timestamp();
        if let Some(last) = self.last_frame.filter(|&last| ts <= last) {
            self.metrics.record_stale();
            self.stale_streak += 1;
            if self.stale_streak == 1 {
                tracing::warn!(
                    "frame at {ts:?} is not newer than {last:?}; skipping frames until the capture clock passes it"
                );
            } else {
                tracing::debug!("skipping stale frame at {ts:?} ({} in a row)", self.stale_streak);
            }
            return Ok(CycleOutcome::Stale);
        }
        if self.stale_streak > 0 {
            tracing::info!("frames advancing again after {} stale", self.stale_streak);
            self.stale_streak = 0;
        }
        self.last_frame = Some(ts);

        let mut new_feedback = Vec::new();
        if let Some(event) = self.apply_pending_swap(ts).await {
            new_feedback.push(event);
        }

        let budget = self.config.inference_timeout();
        let model = self.model.as_mut().ok_or_else(|| {
            PipelineError::ModelLoadFailure(EstimatorError::NotReady(self.config.model.clone()))
        })?;
        let started = Instant::now();
        let result = timeout(budget, model.estimate(&frame)).await;
        let latency = started.elapsed();
        drop(frame);

        let estimate = match result {
            Ok(Ok(estimate)) => estimate,
            Ok(Err(e)) => {
                self.metrics.record_failure();
                tracing::warn!("cycle dropped: {e}");
                return Ok(CycleOutcome::InferenceFailed);
            }
            Err(_) => {
                self.metrics.record_timeout();
                let e = EstimatorError::InferenceTimeout {
                    model_id: model.model_id().to_string(),
                    budget,
                };
                tracing::warn!("cycle dropped: {e}");
                return Ok(CycleOutcome::TimedOut);
            }
        };
        self.metrics.record_inference(latency);

        let pose = self.stabilizer.update(&estimate);
        let angles = self.angles.compute(&pose);
        self.window.push_cycle(&angles);
        let rule_events = self.rules.evaluate(&self.window, ts);
        let tier = self.scorer.record(&rule_events, &angles, ts).clone();
        new_feedback.extend(rule_events);
        self.feedback.extend(new_feedback.iter().cloned());

        self.cycle += 1;
        self.metrics.record_cycle();
        tracing::debug!(
            cycle = self.cycle,
            angles = angles.len(),
            feedback = new_feedback.len(),
            tier = %tier.tier,
            "cycle complete in {latency:?}"
        );

        let snapshot = Arc::new(Snapshot {
            cycle: self.cycle,
            frame_timestamp: ts,
            model_id: estimate.model_id().to_string(),
            angles,
            new_feedback,
            feedback: self.feedback.to_vec(),
            tier,
        });
        self.control.publish(snapshot.clone());
        Ok(CycleOutcome::Completed(snapshot))
    }

    /// Clears tier, feedback, smoothing and angle history, and leaves
    /// `Failed`/`Stopped` for `Idle`. The loaded model is kept.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        self.scorer.reset();
        self.feedback.clear();
        self.stabilizer.reset();
        self.window.clear();
        self.cycle = 0;
        self.last_frame = None;
        self.stale_streak = 0;
        self.control.clear_signals();
        self.control.queue.clear();
        self.control.queue.reopen();
        self.control.clear_latest();
        self.state = PipelineState::Idle;
        tracing::info!("pipeline reset");
        Ok(())
    }

    // ── Private helpers ────────────────────────────────────────

    /// Applies the latest model request, if any. Returns the error feedback
    /// event when the swap fails.
    async fn apply_pending_swap(&mut self, now: Duration) -> Option<FeedbackEvent> {
        let to = self.control.take_swap_request()?;
        let from = self.active_model().unwrap_or_default().to_string();
        if to == from {
            tracing::debug!("model '{to}' already active");
            return None;
        }

        match load_model(&self.registry, &to, self.config.warmup_timeout()).await {
            Ok(model) => {
                if let Some(mut old) = self.model.replace(model) {
                    old.dispose();
                }
                self.stabilizer.reset();
                self.window.clear();
                self.metrics.record_swap(true);
                tracing::info!("model swapped: '{from}' -> '{to}'");
                self.control.emit(StatusEvent::ModelSwapped { from, to });
                None
            }
            Err(e) => {
                self.metrics.record_swap(false);
                tracing::warn!("model swap to '{to}' failed, keeping '{from}': {e}");
                let reason = e.to_string();
                self.control.emit(StatusEvent::ModelSwapFailed {
                    model_id: to.clone(),
                    reason: reason.clone(),
                });
                Some(FeedbackEvent::new(
                    FeedbackKind::Error,
                    format!("Could not switch to model '{to}': {reason}"),
                    MODEL_SWAP_RULE_ID,
                    now,
                ))
            }
        }
    }

    fn finish_stop(&mut self) {
        let released = self.control.queue.clear();
        self.control.queue.close();
        self.state = PipelineState::Stopped;
        tracing::info!("pipeline stopped, released {released} queued frames");
        self.control.emit(StatusEvent::Stopped);
    }

    /// Moves to `Failed`, emits the single fatal status and returns `error`.
    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.control.queue.close();
        self.control.queue.clear();
        if let Some(mut model) = self.model.take() {
            model.dispose();
        }
        self.state = PipelineState::Failed;
        tracing::error!("pipeline failed: {error}");
        self.control.emit(StatusEvent::Fatal {
            error: error.to_string(),
        });
        error
    }
}

/// Creates and warms up `model_id` within `budget`.
///
/// Borrows only the registry so the executor future stays `Send`.
async fn load_model(
    registry: &EstimatorRegistry,
    model_id: &str,
    budget: Duration,
) -> Result<Box<dyn PoseEstimator>, EstimatorError> {
    let mut model = registry.create(model_id)?;
    let started = Instant::now();
    match timeout(budget, model.warm_up()).await {
        Ok(Ok(())) => {
            tracing::info!("model '{model_id}' warmed up in {:?}", started.elapsed());
            Ok(model)
        }
        Ok(Err(e)) => {
            model.dispose();
            Err(e)
        }
        Err(_) => {
            model.dispose();
            Err(EstimatorError::ModelLoad {
                model_id: model_id.to_string(),
                detail: format!("warm-up exceeded {budget:?}"),
            })
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("model", &self.active_model())
            .field("exercise", &self.config.exercise.name)
            .field("cycle", &self.cycle)
            .field("tier", &self.scorer.state().tier)
            .finish()
    }
}
