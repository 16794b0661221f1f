// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `formcheck run` command: a simulated capture session.
//!
//! Three tasks cooperate:
//! ```text
//! capture task ──on_frame──▶ Pipeline::run ──broadcast──▶ printer task
//! ```
//! The capture task stands in for a camera and stops the pipeline after
//! the last frame; the printer shows feedback as it happens plus one
//! status line per second of footage.

use anyhow::Context;
use form_rules::FeedbackEvent;
use frame_queue::{Frame, PushOutcome};
use pipeline::{
    Pipeline, PipelineConfig, PipelineEvent, PipelineHandle, Snapshot, StatusEvent,
};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::MissedTickBehavior;

/// Options for one session.
#[derive(Debug)]
pub struct RunOptions {
    pub model: Option<String>,
    pub frames: u64,
    pub fps: f64,
    /// Model to request, and the frame index at which to request it.
    pub swap: Option<(String, u64)>,
    pub json: bool,
}

pub async fn execute(mut config: PipelineConfig, options: RunOptions) -> anyhow::Result<()> {
    if !(options.fps.is_finite() && options.fps > 0.0) {
        anyhow::bail!("--fps must be a positive number, got {}", options.fps);
    }
    if let Some(model) = options.model {
        config.model = model;
    }

    super::banner("formcheck · Capture Session");
    println!("  Config:");
    println!("   Exercise: {}", config.exercise.name);
    println!("   Model:    {}", config.model);
    println!("   Frames:   {} @ {} fps", options.frames, options.fps);
    if let Some((to, at)) = &options.swap {
        println!("   Swap:     -> {to} at frame {at}");
    }
    println!();

    let mut pipeline = Pipeline::new(config)?;
    let handle = pipeline.handle();

    let report_every = (options.fps.round() as u64).max(1);
    let printer = tokio::spawn(print_events(handle.subscribe(), report_every));
    let capture = tokio::spawn(simulate_capture(
        handle.clone(),
        options.frames,
        options.fps,
        options.swap,
    ));

    let result = pipeline.run().await;
    capture.abort();
    printer.await.context("printer task panicked")?;

    // ── Session Summary ────────────────────────────────────────
    println!();
    println!("  Session:");
    let tier = pipeline.tier();
    println!("   Tier:     {} (score {:.2})", tier.tier, tier.score);
    if let Some(at) = tier.last_changed_at {
        println!("   Reached:  {:.2}s", at.as_secs_f32());
    }
    println!("   Model:    {}", pipeline.active_model().unwrap_or("-"));
    println!();

    println!("  Feedback ({} retained):", pipeline.feedback().len());
    for event in pipeline.feedback().iter() {
        println!("{}", feedback_line(event));
    }
    println!();

    println!("  Metrics:");
    println!("   {}", pipeline.metrics().summary());
    println!("   {}", handle.queue_stats().summary());
    println!();

    if options.json {
        if let Some(snapshot) = handle.latest() {
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        }
    }

    result.context("pipeline terminated")
}

/// Plays the camera: one blank frame per tick, then stops the pipeline.
async fn simulate_capture(
    handle: PipelineHandle,
    frames: u64,
    fps: f64,
    swap: Option<(String, u64)>,
) {
    let interval = Duration::from_secs_f64(1.0 / fps);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for i in 0..frames {
        ticker.tick().await;
        if let Some((to, at)) = &swap {
            if *at == i {
                tracing::info!("requesting model '{to}' at frame {i}");
                handle.request_model(to.clone());
            }
        }
        let frame = Frame::blank(interval.mul_f64(i as f64), 640, 480);
        if handle.on_frame(frame) == PushOutcome::Rejected {
            tracing::debug!("capture ended early: pipeline is not accepting frames");
            return;
        }
    }

    // One more interval so the last frame reaches the executor.
    ticker.tick().await;
    handle.stop();
}

async fn print_events(mut events: broadcast::Receiver<PipelineEvent>, report_every: u64) {
    loop {
        match events.recv().await {
            Ok(PipelineEvent::Snapshot(snapshot)) => {
                let at = snapshot.frame_timestamp.as_secs_f32();
                for event in &snapshot.new_feedback {
                    println!("{}", feedback_line(event));
                }
                if snapshot.cycle % report_every == 0 {
                    println!("  [{at:>7.2}s] {}", status_line(&snapshot));
                }
            }
            Ok(PipelineEvent::Status(status)) => {
                let done = matches!(status, StatusEvent::Stopped | StatusEvent::Fatal { .. });
                println!("  ── {}", describe_status(&status));
                if done {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("printer lagged, skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// The event's own `Display` carries the timestamp.
fn feedback_line(event: &FeedbackEvent) -> String {
    format!("   {event}")
}

fn status_line(snapshot: &Snapshot) -> String {
    let angles: Vec<String> = snapshot
        .angles
        .iter()
        .map(|a| format!("{}={:.0}°", a.label, a.value_degrees))
        .collect();
    format!(
        "cycle {:>5}  {:<22} tier {:<6} {:.2}  {}",
        snapshot.cycle,
        snapshot.model_id,
        snapshot.tier.tier.to_string(),
        snapshot.tier.score,
        angles.join(" "),
    )
}

fn describe_status(status: &StatusEvent) -> String {
    match status {
        StatusEvent::Started { model_id } => format!("started with '{model_id}'"),
        StatusEvent::Stopped => "stopped".to_string(),
        StatusEvent::ModelSwapped { from, to } => format!("model swapped: '{from}' -> '{to}'"),
        StatusEvent::ModelSwapFailed { model_id, reason } => {
            format!("swap to '{model_id}' failed: {reason}")
        }
        StatusEvent::Fatal { error } => format!("FATAL: {error}"),
    }
}
