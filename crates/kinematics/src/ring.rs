// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-capacity ring buffer.
//!
//! Once full, every push overwrites the oldest slot. Storage is allocated
//! once, so the per-frame hot path never reallocates.

/// A ring holding the last `capacity` values in chronological order.
#[derive(Debug, Clone)]
pub struct Ring<T> {
    slots: Vec<T>,
    /// Next slot to write once the ring is full.
    write: usize,
    capacity: usize,
}

impl<T> Ring<T> {
    /// Creates an empty ring. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            write: 0,
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.write] = value;
        }
        self.write = (self.write + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The value pushed `n` pushes ago (`0` = newest).
    pub fn back(&self, n: usize) -> Option<&T> {
        if n >= self.slots.len() {
            return None;
        }
        let newest = (self.write + self.capacity - 1) % self.capacity;
        let idx = (newest + self.capacity - n) % self.capacity;
        self.slots.get(idx)
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<&T> {
        self.back(0)
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let start = if self.is_full() { self.write } else { 0 };
        let len = self.slots.len();
        (0..len).map(move |i| &self.slots[(start + i) % len])
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.write = 0;
    }
}
