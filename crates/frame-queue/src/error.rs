// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the frame queue.

/// Errors that can occur when constructing a frame queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A queue must be able to hold at least one frame.
    #[error("frame queue capacity must be at least 1")]
    ZeroCapacity,
}
