// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: a short squat session against the synthetic estimator.
//!
//! A capture task offers frames at 30 fps while the pipeline runs on its
//! own task. Halfway through, the session switches to the noisy model to
//! show the hot-swap and its effect on the tier.
//!
//! ```bash
//! cargo run -p pipeline --example squat_session
//! ```

use frame_queue::Frame;
use pipeline::{Pipeline, PipelineConfig, PipelineEvent, StatusEvent};
use std::time::Duration;

const FPS: u64 = 30;
const FRAMES: u64 = 180;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut pipeline = Pipeline::new(PipelineConfig::default())?;
    let handle = pipeline.handle();
    let mut events = handle.subscribe();

    let capture = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let interval = Duration::from_millis(1000 / FPS);
            let mut ticker = tokio::time::interval(interval);
            for i in 0..FRAMES {
                ticker.tick().await;
                if i == FRAMES / 2 {
                    handle.request_model("synthetic-squat-noisy");
                }
                handle.on_frame(Frame::blank(interval * i as u32, 640, 480));
            }
            handle.stop();
        })
    };

    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PipelineEvent::Snapshot(snapshot) => {
                    for fb in &snapshot.new_feedback {
                        println!("[{:>6.2}s] {fb}", snapshot.frame_timestamp.as_secs_f32());
                    }
                }
                PipelineEvent::Status(StatusEvent::Stopped) => break,
                PipelineEvent::Status(status) => println!("status: {status:?}"),
            }
        }
    });

    pipeline.run().await?;
    capture.await?;
    printer.await?;

    println!();
    println!("Final tier: {} (score {:.2})", pipeline.tier().tier, pipeline.tier().score);
    println!("{}", pipeline.metrics().summary());
    println!("{}", pipeline.queue_stats().summary());
    Ok(())
}
