// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: frames in through the handle, snapshots and status
//! events out, with every crate of the workspace in the loop.

use form_rules::{Condition, FeedbackKind, Rule, Tier};
use frame_queue::{Frame, PushOutcome};
use kinematics::AngleDefinition;
use pipeline::{
    CycleOutcome, ExerciseProfile, Pipeline, PipelineConfig, PipelineError, PipelineEvent,
    PipelineHandle, PipelineState, Snapshot, StatusEvent, MODEL_SWAP_RULE_ID,
};
use pose_model::{
    coco, squat_keypoints, EstimatorError, EstimatorRegistry, Keypoint, PoseEstimate,
    PoseEstimator, ReplayEstimator, SyntheticSettings, SyntheticSquat,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;

// ── Helpers ────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);
const FRAME_INTERVAL_MS: u64 = 33;

fn frame(index: u64) -> Frame {
    Frame::blank(Duration::from_millis(index * FRAME_INTERVAL_MS), 8, 8)
}

type RunTask = JoinHandle<(Pipeline, Result<(), PipelineError>)>;

fn spawn_run(mut pipeline: Pipeline) -> RunTask {
    tokio::spawn(async move {
        let result = pipeline.run().await;
        (pipeline, result)
    })
}

async fn next_snapshot(rx: &mut broadcast::Receiver<PipelineEvent>) -> Arc<Snapshot> {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::Snapshot(s)) => return s,
                Ok(PipelineEvent::Status(_)) => continue,
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a snapshot")
}

async fn next_status(rx: &mut broadcast::Receiver<PipelineEvent>) -> StatusEvent {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::Status(s)) => return s,
                Ok(PipelineEvent::Snapshot(_)) => continue,
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a status event")
}

/// Offers one frame and waits for the cycle it produces.
async fn feed(
    handle: &PipelineHandle,
    rx: &mut broadcast::Receiver<PipelineEvent>,
    index: u64,
) -> Arc<Snapshot> {
    assert_eq!(handle.on_frame(frame(index)), PushOutcome::Enqueued);
    next_snapshot(rx).await
}

/// Left-knee-only exercise with a single "crosses below 155" warning.
fn knee_warning_config(model: &str, stabilizer_window: usize) -> PipelineConfig {
    let mut config = PipelineConfig {
        model: model.into(),
        exercise: ExerciseProfile {
            name: "knee-check".into(),
            history: 30,
            angles: vec![AngleDefinition::new(
                "left_knee",
                coco::LEFT_HIP,
                coco::LEFT_KNEE,
                coco::LEFT_ANKLE,
            )],
            rules: vec![Rule::new(
                "knees-over-toes",
                FeedbackKind::Warn,
                "Knees are tracking past your toes",
                Condition::CrossesBelow {
                    label: "left_knee".into(),
                    threshold: 155.0,
                },
            )],
        },
        ..Default::default()
    };
    config.stabilizer.window = stabilizer_window;
    config
}

/// Ten poses with the knee going linearly from 170° to 150°.
fn descending_knee() -> Vec<Vec<Keypoint>> {
    (0..10)
        .map(|i| squat_keypoints(170.0 - 20.0 * i as f32 / 9.0, 170.0))
        .collect()
}

fn registry_with_replay(id: &'static str, poses: Vec<Vec<Keypoint>>) -> EstimatorRegistry {
    let mut registry = EstimatorRegistry::with_builtins();
    registry.register(id, move || {
        Box::new(ReplayEstimator::from_poses(id, poses.clone()).looping(false))
    });
    registry
}

type EventLog = Arc<Mutex<Vec<String>>>;

/// Estimator that records its lifecycle and can hold `estimate` until released.
struct Recording {
    id: String,
    log: EventLog,
    gate: Option<Arc<Notify>>,
    warm_up_delay: Duration,
    warm_up_fails: bool,
}

impl Recording {
    fn new(id: &str, log: EventLog) -> Self {
        Self {
            id: id.into(),
            log,
            gate: None,
            warm_up_delay: Duration::ZERO,
            warm_up_fails: false,
        }
    }

    fn record(&self, what: &str) {
        self.log.lock().unwrap().push(format!("{}:{what}", self.id));
    }
}

#[async_trait::async_trait]
impl PoseEstimator for Recording {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn warm_up(&mut self) -> Result<(), EstimatorError> {
        self.record("warm_up");
        if !self.warm_up_delay.is_zero() {
            tokio::time::sleep(self.warm_up_delay).await;
        }
        if self.warm_up_fails {
            return Err(EstimatorError::ModelLoad {
                model_id: self.id.clone(),
                detail: "weights missing".into(),
            });
        }
        Ok(())
    }

    async fn estimate(&mut self, frame: &Frame) -> Result<PoseEstimate, EstimatorError> {
        self.record("start");
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.record("end");
        Ok(PoseEstimate::new(
            frame.timestamp(),
            self.id.clone(),
            squat_keypoints(150.0, 150.0),
        ))
    }

    fn dispose(&mut self) {
        self.record("dispose");
    }
}

async fn wait_for_log(log: &EventLog, entry: &str) {
    timeout(WAIT, async {
        while !log.lock().unwrap().iter().any(|e| e == entry) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("log entry never appeared");
}

// ── Feedback rules end-to-end ──────────────────────────────────

#[tokio::test]
async fn test_descending_knee_warns_once_at_first_crossing() {
    let config = knee_warning_config("descent", 1);
    let registry = registry_with_replay("descent", descending_knee());
    let pipeline = Pipeline::with_registry(config, registry).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    assert!(matches!(next_status(&mut rx).await, StatusEvent::Started { .. }));

    let mut warned_at = Vec::new();
    for i in 0..10 {
        let snapshot = feed(&handle, &mut rx, i).await;
        for event in &snapshot.new_feedback {
            assert_eq!(event.kind, FeedbackKind::Warn);
            assert_eq!(event.rule_id, "knees-over-toes");
            warned_at.push(i);
        }
    }
    // 156.7° at frame 6, 154.4° at frame 7.
    assert_eq!(warned_at, vec![7]);

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    assert_eq!(pipeline.feedback().len(), 1);
}

#[tokio::test]
async fn test_descending_knee_with_smoothing_warns_once() {
    let config = knee_warning_config("descent", 5);
    let registry = registry_with_replay("descent", descending_knee());
    let pipeline = Pipeline::with_registry(config, registry).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    next_status(&mut rx).await;

    let mut warnings = 0;
    for i in 0..10 {
        let snapshot = feed(&handle, &mut rx, i).await;
        warnings += snapshot
            .new_feedback
            .iter()
            .filter(|e| e.kind == FeedbackKind::Warn)
            .count();
    }
    assert_eq!(warnings, 1);

    handle.stop();
    task.await.unwrap().1.unwrap();
}

#[tokio::test]
async fn test_missing_keypoint_omits_angle_only() {
    let poses: Vec<Vec<Keypoint>> = (0..5)
        .map(|_| {
            squat_keypoints(120.0, 100.0)
                .into_iter()
                .filter(|k| k.id != coco::LEFT_ANKLE)
                .collect()
        })
        .collect();
    let config = PipelineConfig {
        model: "partial".into(),
        ..Default::default()
    };
    let mut pipeline =
        Pipeline::with_registry(config, registry_with_replay("partial", poses)).unwrap();
    pipeline.start().await.unwrap();

    for i in 0..5 {
        let CycleOutcome::Completed(snapshot) = pipeline.process_frame(frame(i)).await.unwrap()
        else {
            panic!("cycle {i} did not complete");
        };
        assert!(snapshot.angle("left_knee").is_none());
        let right = snapshot.angle("right_knee").unwrap();
        assert!((right.value_degrees - 120.0).abs() < 0.1);
    }

    // The replay runs out: empty estimates still complete cycles.
    let CycleOutcome::Completed(snapshot) = pipeline.process_frame(frame(5)).await.unwrap() else {
        panic!("empty estimate must not fail the cycle");
    };
    assert_eq!(snapshot.cycle, 6);
}

// ── Hot-swap ───────────────────────────────────────────────────

#[tokio::test]
async fn test_hot_swap_waits_for_in_flight_estimate() {
    let log: EventLog = Arc::default();
    let gate = Arc::new(Notify::new());

    let mut registry = EstimatorRegistry::new();
    {
        let (log, gate) = (log.clone(), gate.clone());
        registry.register("model-a", move || {
            let mut m = Recording::new("model-a", log.clone());
            m.gate = Some(gate.clone());
            Box::new(m)
        });
    }
    {
        let log = log.clone();
        registry.register("model-b", move || Box::new(Recording::new("model-b", log.clone())));
    }

    let config = PipelineConfig {
        model: "model-a".into(),
        inference_timeout_ms: 5_000,
        ..Default::default()
    };
    let pipeline = Pipeline::with_registry(config, registry).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    next_status(&mut rx).await;

    handle.on_frame(frame(0));
    wait_for_log(&log, "model-a:start").await;

    handle.request_model("model-b");
    handle.on_frame(frame(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(
        !log.lock().unwrap().iter().any(|e| e.starts_with("model-b")),
        "swap must wait for the in-flight estimate"
    );

    gate.notify_one();
    let first = next_snapshot(&mut rx).await;
    let swapped = next_status(&mut rx).await;
    let second = next_snapshot(&mut rx).await;

    assert_eq!(first.model_id, "model-a");
    assert_eq!(
        swapped,
        StatusEvent::ModelSwapped {
            from: "model-a".into(),
            to: "model-b".into()
        }
    );
    assert_eq!(second.model_id, "model-b");
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "model-a:warm_up",
            "model-a:start",
            "model-a:end",
            "model-b:warm_up",
            "model-a:dispose",
            "model-b:start",
            "model-b:end",
        ]
    );

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    assert_eq!(pipeline.active_model(), Some("model-b"));
    assert_eq!(pipeline.metrics().swaps_applied, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_warm_up_keeps_previous_model() {
    let log: EventLog = Arc::default();
    let mut registry = EstimatorRegistry::with_builtins();
    {
        let log = log.clone();
        registry.register("broken", move || {
            let mut m = Recording::new("broken", log.clone());
            m.warm_up_fails = true;
            Box::new(m)
        });
    }
    {
        let log = log.clone();
        registry.register("sluggish", move || {
            let mut m = Recording::new("sluggish", log.clone());
            m.warm_up_delay = Duration::from_secs(10);
            Box::new(m)
        });
    }
    let config = PipelineConfig {
        warmup_timeout_ms: 500,
        ..Default::default()
    };
    let mut pipeline = Pipeline::with_registry(config, registry).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    pipeline.start().await.unwrap();

    for (i, id) in ["broken", "sluggish"].into_iter().enumerate() {
        handle.request_model(id);
        let CycleOutcome::Completed(snapshot) =
            pipeline.process_frame(frame(i as u64)).await.unwrap()
        else {
            panic!("cycle must complete on the previous model");
        };
        assert_eq!(snapshot.model_id, "synthetic-squat");
        let error = &snapshot.new_feedback[0];
        assert_eq!(error.kind, FeedbackKind::Error);
        assert_eq!(error.rule_id, MODEL_SWAP_RULE_ID);
        assert!(error.text.contains(id));

        let status = next_status(&mut rx).await;
        let status = if matches!(status, StatusEvent::Started { .. }) {
            next_status(&mut rx).await
        } else {
            status
        };
        assert!(matches!(status, StatusEvent::ModelSwapFailed { ref model_id, .. } if model_id == id));
    }

    assert_eq!(pipeline.active_model(), Some("synthetic-squat"));
    assert_eq!(pipeline.metrics().swaps_failed, 2);
    let log = log.lock().unwrap();
    assert!(log.contains(&"broken:dispose".to_string()));
    assert!(log.contains(&"sluggish:dispose".to_string()));
}

// ── Timeouts and failures ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_inference_timeout_drops_cycle() {
    let mut registry = EstimatorRegistry::with_builtins();
    registry.register("slow", || {
        Box::new(SyntheticSquat::new(
            "slow",
            SyntheticSettings {
                latency: Duration::from_millis(250),
                ..SyntheticSettings::clean()
            },
        ))
    });
    let config = PipelineConfig {
        model: "slow".into(),
        inference_timeout_ms: 100,
        ..Default::default()
    };
    let mut pipeline = Pipeline::with_registry(config, registry).unwrap();
    let handle = pipeline.handle();
    pipeline.start().await.unwrap();

    for i in 0..3 {
        assert!(matches!(
            pipeline.process_frame(frame(i)).await.unwrap(),
            CycleOutcome::TimedOut
        ));
    }
    assert_eq!(pipeline.metrics().inference_timeouts, 3);
    assert_eq!(pipeline.metrics().cycles_completed, 0);
    assert!(handle.latest().is_none());
    assert_eq!(pipeline.tier().tier, Tier::None);

    // A fast model recovers on the next cycle.
    handle.request_model("synthetic-squat");
    assert!(matches!(
        pipeline.process_frame(frame(3)).await.unwrap(),
        CycleOutcome::Completed(_)
    ));
}

#[tokio::test]
async fn test_source_failure_is_fatal_once() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    next_status(&mut rx).await;
    feed(&handle, &mut rx, 0).await;

    handle.fail_source("camera unplugged");
    handle.fail_source("camera unplugged again");
    let (pipeline, result) = task.await.unwrap();

    assert!(matches!(result, Err(PipelineError::FrameSourceFailure(_))));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(handle.on_frame(frame(1)), PushOutcome::Rejected);

    let mut fatal = 0;
    while let Ok(event) = rx.try_recv() {
        if let PipelineEvent::Status(StatusEvent::Fatal { error }) = event {
            assert!(error.contains("camera unplugged"));
            fatal += 1;
        }
    }
    assert_eq!(fatal, 1);
}

#[tokio::test]
async fn test_unknown_start_model_fails_run() {
    let config = PipelineConfig {
        model: "movenet-thunder".into(),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(config).unwrap();
    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::ModelLoadFailure(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

// ── Lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_and_restart_preserve_tier_and_feedback() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    next_status(&mut rx).await;

    let mut last = None;
    for i in 0..40 {
        last = Some(feed(&handle, &mut rx, i).await);
    }
    let last = last.unwrap();
    assert_eq!(last.tier.tier, Tier::Gold);
    assert!(!last.feedback.is_empty());

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(pipeline.tier(), &last.tier);
    assert_eq!(pipeline.feedback().to_vec(), last.feedback);
    assert_eq!(handle.on_frame(frame(40)), PushOutcome::Rejected);

    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    assert!(matches!(next_status(&mut rx).await, StatusEvent::Started { .. }));
    assert_eq!(handle.latest().as_deref(), Some(&*last));

    let next = feed(&handle, &mut rx, 41).await;
    assert_eq!(next.cycle, last.cycle + 1);
    assert_eq!(next.tier.tier, Tier::Gold);
    assert!(next.feedback.starts_with(&last.feedback));

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    assert_eq!(pipeline.metrics().cycles_completed, 41);
}

#[tokio::test]
async fn test_burst_drops_oldest_frames() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let handle = pipeline.handle();
    let outcomes: Vec<PushOutcome> = (0..5).map(|i| handle.on_frame(frame(i))).collect();
    assert_eq!(
        outcomes,
        vec![
            PushOutcome::Enqueued,
            PushOutcome::Enqueued,
            PushOutcome::DroppedOldest,
            PushOutcome::DroppedOldest,
            PushOutcome::DroppedOldest,
        ]
    );
    let stats = handle.queue_stats();
    assert_eq!(stats.dropped, 3);
    assert_eq!(stats.high_water_mark, 2);

    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    let first = next_snapshot(&mut rx).await;
    let second = next_snapshot(&mut rx).await;
    assert_eq!(first.frame_timestamp, Duration::from_millis(3 * FRAME_INTERVAL_MS));
    assert_eq!(second.frame_timestamp, Duration::from_millis(4 * FRAME_INTERVAL_MS));

    handle.stop();
    task.await.unwrap().1.unwrap();
}

#[tokio::test]
async fn test_stop_before_run_returns_immediately() {
    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let handle = pipeline.handle();
    handle.on_frame(frame(0));
    handle.stop();
    pipeline.run().await.unwrap();
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(pipeline.active_model(), None);
    assert_eq!(handle.queue_stats().released_on_clear, 1);
}

#[tokio::test]
async fn test_redundant_stop_does_not_cancel_next_run() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let handle = pipeline.handle();
    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    next_status(&mut rx).await;
    feed(&handle, &mut rx, 0).await;

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    handle.stop();

    let mut rx = handle.subscribe();
    let task = spawn_run(pipeline);
    assert!(matches!(next_status(&mut rx).await, StatusEvent::Started { .. }));
    let snapshot = feed(&handle, &mut rx, 1).await;
    assert_eq!(snapshot.cycle, 2);

    handle.stop();
    let (pipeline, result) = task.await.unwrap();
    result.unwrap();
    assert_eq!(pipeline.metrics().cycles_completed, 2);
}

// ── Scoring ────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_scene_earns_no_tier() {
    let config = PipelineConfig {
        model: "empty".into(),
        ..Default::default()
    };
    let registry = registry_with_replay("empty", vec![Vec::new(); 40]);
    let mut pipeline = Pipeline::with_registry(config, registry).unwrap();
    pipeline.start().await.unwrap();

    for i in 0..40 {
        let CycleOutcome::Completed(snapshot) = pipeline.process_frame(frame(i)).await.unwrap()
        else {
            panic!("empty estimate must still complete the cycle");
        };
        assert!(snapshot.angles.is_empty());
    }
    assert_eq!(pipeline.tier().tier, Tier::None);
    assert_eq!(pipeline.tier().score, 0.0);
}

// ── Diagnostics ────────────────────────────────────────────────

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_clock_going_backwards_warns_once_per_streak() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    pipeline.start().await.unwrap();
    pipeline.process_frame(frame(100)).await.unwrap();

    // Capture clock restarted: every frame below 3.3 s is stale.
    for i in 0..5 {
        assert!(matches!(
            pipeline.process_frame(frame(i)).await.unwrap(),
            CycleOutcome::Stale
        ));
    }
    assert_eq!(pipeline.metrics().stale_frames, 5);
    assert_eq!(logs.contents().matches("WARN").count(), 1);
    assert!(logs.contents().contains("not newer than"));

    // Advancing again, then a second jump back warns again.
    pipeline.process_frame(frame(101)).await.unwrap();
    pipeline.process_frame(frame(50)).await.unwrap();
    assert_eq!(logs.contents().matches("WARN").count(), 2);
}
