// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Feedback events and the bounded feedback history.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Severity of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Ok,
    Warn,
    Info,
    Error,
}

impl FeedbackKind {
    /// `warn` and `error` count against a cycle's form quality.
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for the user, produced by a rule or by the pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeedbackEvent {
    pub kind: FeedbackKind,
    pub text: String,
    pub rule_id: String,
    pub timestamp: Duration,
}

impl FeedbackEvent {
    pub fn new(
        kind: FeedbackKind,
        text: impl Into<String>,
        rule_id: impl Into<String>,
        timestamp: Duration,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            rule_id: rule_id.into(),
            timestamp,
        }
    }
}

impl fmt::Display for FeedbackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>8.3}s] {:<5} {} ({})",
            self.timestamp.as_secs_f64(),
            self.kind,
            self.text,
            self.rule_id
        )
    }
}

/// The most recent `capacity` feedback events, oldest first.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    events: VecDeque<FeedbackEvent>,
    capacity: usize,
}

impl FeedbackLog {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: FeedbackEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = FeedbackEvent>) {
        for e in events {
            self.push(e);
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FeedbackEvent> {
        self.events.iter()
    }

    /// Copies the history into a `Vec`, oldest first.
    pub fn to_vec(&self) -> Vec<FeedbackEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(i: u64) -> FeedbackEvent {
        FeedbackEvent::new(FeedbackKind::Info, format!("e{i}"), "r", Duration::from_millis(i))
    }

    #[test]
    fn test_kind_serde_lowercase() {
        #[derive(serde::Deserialize)]
        struct W {
            kind: FeedbackKind,
        }
        let w: W = toml::from_str(r#"kind = "warn""#).unwrap();
        assert_eq!(w.kind, FeedbackKind::Warn);
        assert!(w.kind.is_problem());
        assert!(FeedbackKind::Error.is_problem());
        assert!(!FeedbackKind::Ok.is_problem());
        assert!(!FeedbackKind::Info.is_problem());
    }

    #[test]
    fn test_log_keeps_most_recent() {
        let mut log = FeedbackLog::new(3);
        log.extend((0..5).map(event));
        assert_eq!(log.len(), 3);
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["e2", "e3", "e4"]);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_display() {
        let e = FeedbackEvent::new(
            FeedbackKind::Warn,
            "Too deep",
            "too-deep",
            Duration::from_millis(1500),
        );
        let s = e.to_string();
        assert!(s.contains("warn"));
        assert!(s.contains("Too deep"));
        assert!(s.contains("1.500s"));
    }
}
