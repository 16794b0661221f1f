// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Ordered rule evaluation.

use crate::feedback::FeedbackEvent;
use crate::rule::Rule;
use crate::window::AngleWindow;
use crate::RuleError;
use std::collections::HashSet;
use std::time::Duration;

/// A validated, ordered rule set.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Validates `rules` against the defined angle `labels`.
    ///
    /// Fails on duplicate ids, unknown labels, bad parameters, or a rule
    /// that needs more than `history` cycles of angle history.
    pub fn new<S: AsRef<str>>(
        rules: Vec<Rule>,
        labels: &[S],
        history: usize,
    ) -> Result<Self, RuleError> {
        let known: HashSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        let mut ids = HashSet::new();

        for rule in &rules {
            if rule.id.trim().is_empty() {
                return Err(RuleError::InvalidRule {
                    rule_id: rule.id.clone(),
                    detail: "id must not be empty".into(),
                });
            }
            if !ids.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateRule(rule.id.clone()));
            }
            for label in rule.condition.labels() {
                if !known.contains(label) {
                    return Err(RuleError::UnknownLabel {
                        rule_id: rule.id.clone(),
                        label: label.to_string(),
                    });
                }
            }
            rule.condition.validate(&rule.id)?;
            let needed = rule.condition.history_needed();
            if needed > history {
                return Err(RuleError::InvalidRule {
                    rule_id: rule.id.clone(),
                    detail: format!("needs {needed} cycles of history, window keeps {history}"),
                });
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule in definition order.
    ///
    /// All rules that hold fire; rules that cannot be decided are skipped.
    pub fn evaluate(&self, window: &AngleWindow, timestamp: Duration) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();
        for rule in &self.rules {
            match rule.condition.evaluate(window) {
                Some(true) => {
                    tracing::debug!(rule = %rule.id, kind = %rule.kind, "rule fired");
                    events.push(FeedbackEvent::new(
                        rule.kind,
                        rule.text.clone(),
                        rule.id.clone(),
                        timestamp,
                    ));
                }
                Some(false) => {}
                None => tracing::trace!(rule = %rule.id, "skipped: not enough angle history"),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, FeedbackKind};
    use kinematics::AngleSample;

    fn below(id: &str, label: &str, threshold: f32, kind: FeedbackKind) -> Rule {
        Rule::new(
            id,
            kind,
            format!("{label} below {threshold}"),
            Condition::CrossesBelow {
                label: label.into(),
                threshold,
            },
        )
    }

    fn sample(label: &str, v: f32) -> AngleSample {
        AngleSample {
            label: label.into(),
            value_degrees: v,
            confidence: 0.9,
            timestamp: Duration::ZERO,
        }
    }

    #[test]
    fn test_single_warn_on_linear_descent() {
        // Ten frames from 170 down to 150; the threshold is first crossed at
        // index 7 (154.44).
        let engine = RuleEngine::new(
            vec![below("knees-over-toes", "knee", 155.0, FeedbackKind::Warn)],
            &["knee"],
            30,
        )
        .unwrap();
        let mut window = AngleWindow::new(&["knee"], 30);
        let mut fired_at = Vec::new();
        for i in 0..10 {
            let v = 170.0 - 20.0 * i as f32 / 9.0;
            window.push_cycle(&[sample("knee", v)]);
            let events = engine.evaluate(&window, Duration::from_millis(i * 33));
            for e in &events {
                assert_eq!(e.kind, FeedbackKind::Warn);
                fired_at.push(i);
            }
        }
        assert_eq!(fired_at, vec![7]);
    }

    #[test]
    fn test_multiple_rules_fire_in_order() {
        let engine = RuleEngine::new(
            vec![
                below("b", "knee", 100.0, FeedbackKind::Info),
                below("a", "knee", 120.0, FeedbackKind::Warn),
            ],
            &["knee"],
            30,
        )
        .unwrap();
        let mut window = AngleWindow::new(&["knee"], 30);
        window.push_cycle(&[sample("knee", 130.0)]);
        window.push_cycle(&[sample("knee", 90.0)]);
        let events = engine.evaluate(&window, Duration::from_secs(1));
        let ids: Vec<_> = events.iter().map(|e| e.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(events[0].timestamp, Duration::from_secs(1));
    }

    #[test]
    fn test_missing_angle_skips_silently() {
        let engine = RuleEngine::new(
            vec![below("r", "knee", 155.0, FeedbackKind::Warn)],
            &["knee"],
            30,
        )
        .unwrap();
        let mut window = AngleWindow::new(&["knee"], 30);
        window.push_cycle(&[sample("knee", 170.0)]);
        window.push_cycle(&[]);
        assert!(engine.evaluate(&window, Duration::ZERO).is_empty());
    }

    #[test]
    fn test_rejects_unknown_label() {
        let err = RuleEngine::new(
            vec![below("r", "elbow", 90.0, FeedbackKind::Warn)],
            &["knee"],
            30,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownLabel {
                rule_id: "r".into(),
                label: "elbow".into()
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let err = RuleEngine::new(
            vec![
                below("r", "knee", 90.0, FeedbackKind::Warn),
                below("r", "knee", 80.0, FeedbackKind::Warn),
            ],
            &["knee"],
            30,
        )
        .unwrap_err();
        assert_eq!(err, RuleError::DuplicateRule("r".into()));
    }

    #[test]
    fn test_rejects_rule_longer_than_history() {
        let trend = Rule::new(
            "t",
            FeedbackKind::Info,
            "trend",
            Condition::Trend {
                label: "knee".into(),
                direction: crate::TrendDirection::Decreasing,
                samples: 10,
                min_change: 0.0,
            },
        );
        assert!(RuleEngine::new(vec![trend.clone()], &["knee"], 5).is_err());
        assert!(RuleEngine::new(vec![trend], &["knee"], 11).is_ok());
    }
}
