// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for rule loading and scoring configuration.

/// Errors raised while validating rules or scorer settings.
///
/// Rule evaluation itself never fails: a rule that lacks the history or
/// angles it needs is skipped for that cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// A rule references an angle label that is not defined.
    #[error("rule '{rule_id}' references unknown angle '{label}'")]
    UnknownLabel { rule_id: String, label: String },

    /// Two rules share an id.
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),

    /// A rule's parameters are out of range.
    #[error("invalid rule '{rule_id}': {detail}")]
    InvalidRule { rule_id: String, detail: String },

    /// Window or scorer settings are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
