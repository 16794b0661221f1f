// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-label angle history.
//!
//! One [`Ring`] per angle label, indexed by definition order. Every cycle
//! pushes exactly one slot per label, `None` when the angle was omitted, so
//! all rings advance in lockstep and `back(n)` always means "n cycles ago".

use kinematics::{AngleSample, Ring};
use std::collections::HashMap;

/// Default number of cycles kept per label.
pub const DEFAULT_HISTORY: usize = 30;

pub struct AngleWindow {
    labels: Vec<String>,
    slots: HashMap<String, usize>,
    rings: Vec<Ring<Option<AngleSample>>>,
    cycles: u64,
}

impl AngleWindow {
    /// Creates a window for `labels` keeping `history` cycles each.
    pub fn new<S: AsRef<str>>(labels: &[S], history: usize) -> Self {
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        let slots = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        let rings = labels.iter().map(|_| Ring::new(history)).collect();
        Self {
            labels,
            slots,
            rings,
            cycles: 0,
        }
    }

    /// Records one cycle. Samples with unknown labels are ignored.
    pub fn push_cycle(&mut self, samples: &[AngleSample]) {
        let mut row: Vec<Option<AngleSample>> = vec![None; self.labels.len()];
        for s in samples {
            if let Some(&i) = self.slots.get(&s.label) {
                row[i] = Some(s.clone());
            }
        }
        for (ring, slot) in self.rings.iter_mut().zip(row) {
            ring.push(slot);
        }
        self.cycles += 1;
    }

    pub fn contains(&self, label: &str) -> bool {
        self.slots.contains_key(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Cycles kept per label.
    pub fn history(&self) -> usize {
        self.rings.first().map_or(0, Ring::capacity)
    }

    /// Cycles recorded since creation or the last [`clear`](Self::clear).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The sample recorded `cycles_ago` cycles back (`0` = current).
    pub fn sample(&self, label: &str, cycles_ago: usize) -> Option<&AngleSample> {
        let i = *self.slots.get(label)?;
        self.rings[i].back(cycles_ago)?.as_ref()
    }

    /// Angle value in degrees `cycles_ago` cycles back.
    pub fn value(&self, label: &str, cycles_ago: usize) -> Option<f32> {
        self.sample(label, cycles_ago).map(|s| s.value_degrees)
    }

    /// The `count` values ending `offset` cycles ago, oldest first.
    ///
    /// `None` if the history is too short or any of those cycles lacks
    /// the angle.
    pub fn recent(&self, label: &str, count: usize, offset: usize) -> Option<Vec<f32>> {
        let mut values = (offset..offset + count)
            .map(|n| self.value(label, n))
            .collect::<Option<Vec<f32>>>()?;
        values.reverse();
        Some(values)
    }

    pub fn clear(&mut self) {
        for ring in &mut self.rings {
            ring.clear();
        }
        self.cycles = 0;
    }
}

impl std::fmt::Debug for AngleWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngleWindow")
            .field("labels", &self.labels)
            .field("history", &self.history())
            .field("cycles", &self.cycles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn s(label: &str, v: f32) -> AngleSample {
        AngleSample {
            label: label.into(),
            value_degrees: v,
            confidence: 0.9,
            timestamp: Duration::ZERO,
        }
    }

    #[test]
    fn test_lockstep_rings() {
        let mut w = AngleWindow::new(&["knee", "hip"], 4);
        w.push_cycle(&[s("knee", 170.0), s("hip", 160.0)]);
        w.push_cycle(&[s("knee", 165.0)]);
        assert_eq!(w.value("knee", 0), Some(165.0));
        assert_eq!(w.value("knee", 1), Some(170.0));
        assert_eq!(w.value("hip", 0), None);
        assert_eq!(w.value("hip", 1), Some(160.0));
        assert_eq!(w.cycles(), 2);
    }

    #[test]
    fn test_recent_order_and_gaps() {
        let mut w = AngleWindow::new(&["knee"], 10);
        for v in [170.0, 160.0, 150.0] {
            w.push_cycle(&[s("knee", v)]);
        }
        assert_eq!(w.recent("knee", 3, 0), Some(vec![170.0, 160.0, 150.0]));
        assert_eq!(w.recent("knee", 2, 1), Some(vec![170.0, 160.0]));
        assert_eq!(w.recent("knee", 4, 0), None);
        w.push_cycle(&[]);
        assert_eq!(w.recent("knee", 2, 0), None);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut w = AngleWindow::new(&["knee"], 3);
        for v in 0..10 {
            w.push_cycle(&[s("knee", v as f32)]);
        }
        assert_eq!(w.history(), 3);
        assert_eq!(w.recent("knee", 3, 0), Some(vec![7.0, 8.0, 9.0]));
        assert_eq!(w.value("knee", 3), None);
    }

    #[test]
    fn test_unknown_label_and_clear() {
        let mut w = AngleWindow::new(&["knee"], 3);
        w.push_cycle(&[s("elbow", 90.0), s("knee", 100.0)]);
        assert!(!w.contains("elbow"));
        assert_eq!(w.value("elbow", 0), None);
        w.clear();
        assert_eq!(w.value("knee", 0), None);
        assert_eq!(w.cycles(), 0);
    }
}
