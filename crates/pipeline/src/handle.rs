// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The collaborator-facing side of the pipeline.
//!
//! Everything that crosses task boundaries lives in [`Control`]: the frame
//! queue, the pending model request, the stop and failure signals, and the
//! output channels. The cycle executor owns everything else.

use crate::{PipelineEvent, Snapshot, StatusEvent};
use frame_queue::{Frame, FrameQueue, PushOutcome, QueueStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

pub(crate) struct Control {
    pub(crate) queue: FrameQueue,
    swap_request: Mutex<Option<String>>,
    stop: AtomicBool,
    source_failure: Mutex<Option<String>>,
    snapshots: watch::Sender<Option<Arc<Snapshot>>>,
    events: broadcast::Sender<PipelineEvent>,
}

impl Control {
    pub(crate) fn new(queue: FrameQueue) -> Self {
        let (snapshots, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queue,
            swap_request: Mutex::new(None),
            stop: AtomicBool::new(false),
            source_failure: Mutex::new(None),
            snapshots,
            events,
        }
    }

    pub(crate) fn take_swap_request(&self) -> Option<String> {
        self.swap_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn take_source_failure(&self) -> Option<String> {
        self.source_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Consumes a pending stop request.
    pub(crate) fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn has_pending_signal(&self) -> bool {
        self.stop_requested()
            || self
                .source_failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
    }

    /// Drops pending stop, failure and swap requests.
    pub(crate) fn clear_signals(&self) {
        self.stop.store(false, Ordering::Release);
        self.take_source_failure();
        self.take_swap_request();
    }

    pub(crate) fn publish(&self, snapshot: Arc<Snapshot>) {
        self.snapshots.send_replace(Some(snapshot.clone()));
        // No subscribers is fine.
        let _ = self.events.send(PipelineEvent::Snapshot(snapshot));
    }

    pub(crate) fn clear_latest(&self) {
        self.snapshots.send_replace(None);
    }

    pub(crate) fn emit(&self, status: StatusEvent) {
        let _ = self.events.send(PipelineEvent::Status(status));
    }
}

/// Cloneable handle used by capture, UI and control collaborators.
#[derive(Clone)]
pub struct PipelineHandle {
    control: Arc<Control>,
}

impl PipelineHandle {
    pub(crate) fn new(control: Arc<Control>) -> Self {
        Self { control }
    }

    /// Offers a frame to the pipeline. Never blocks.
    ///
    /// When the queue is full the oldest queued frame is released. Frames
    /// offered while the pipeline is stopped or failed are rejected.
    pub fn on_frame(&self, frame: Frame) -> PushOutcome {
        self.control.queue.push(frame)
    }

    /// Requests a model swap at the next cycle boundary.
    ///
    /// Only the latest request is kept.
    pub fn request_model(&self, model_id: impl Into<String>) {
        let model_id = model_id.into();
        tracing::debug!("model '{model_id}' requested");
        let mut pending = self
            .control
            .swap_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(model_id) {
            tracing::debug!("superseded pending request for '{previous}'");
        }
    }

    /// Asks the running pipeline to stop after the in-flight cycle.
    ///
    /// A pipeline that has not run yet stops as soon as `run` is called.
    /// Once stopped or failed the call does nothing, so it never carries
    /// over into the next run.
    pub fn stop(&self) {
        if self.control.queue.is_closed() {
            tracing::debug!("stop ignored: pipeline is not accepting frames");
            return;
        }
        self.control.stop.store(true, Ordering::Release);
        self.control.queue.close();
    }

    /// Reports an unrecoverable capture failure; the pipeline moves to `Failed`.
    pub fn fail_source(&self, reason: impl Into<String>) {
        *self
            .control
            .source_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
        self.control.queue.close();
    }

    /// The most recent snapshot, if any cycle has completed.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.control.snapshots.borrow().clone()
    }

    /// A receiver that observes every new latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.control.snapshots.subscribe()
    }

    /// Per-cycle snapshots and lifecycle status events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.control.events.subscribe()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.control.queue.stats()
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("queued", &self.control.queue.len())
            .field("stop_requested", &self.control.stop_requested())
            .finish()
    }
}
