// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # form-rules
//!
//! Data-driven form feedback and tier scoring.
//!
//! Each cycle the pipeline pushes the computed angles into an
//! [`AngleWindow`], asks the [`RuleEngine`] for [`FeedbackEvent`]s, then
//! hands both to the [`TierScorer`]:
//!
//! ```text
//! [AngleSample] ──► AngleWindow ──► RuleEngine ──► [FeedbackEvent]
//!        │                                              │
//!        └──────────────────► TierScorer ◄──────────────┘
//!                                  │
//!                               TierState
//! ```
//!
//! Rules are pure predicates over the window and are loaded from TOML:
//!
//! ```
//! use form_rules::{Condition, Rule};
//!
//! let rule: Rule = toml::from_str(r#"
//!     id = "knees-over-toes"
//!     kind = "warn"
//!     text = "Knees are tracking past your toes"
//!     condition = { type = "crosses_below", label = "left_knee", threshold = 155.0 }
//! "#).unwrap();
//! assert!(matches!(rule.condition, Condition::CrossesBelow { .. }));
//! ```

mod engine;
mod error;
mod feedback;
mod rule;
pub mod tier;
mod window;

pub use engine::RuleEngine;
pub use error::RuleError;
pub use feedback::{FeedbackEvent, FeedbackKind, FeedbackLog};
pub use rule::{Condition, Rule, TrendDirection};
pub use tier::{apply_hysteresis, Tier, TierConfig, TierScorer, TierState};
pub use window::{AngleWindow, DEFAULT_HISTORY};
