// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A deadline-ordered queue of cancelable timers.
//!
//! The queue never sleeps. The owner asks for [`TimerQueue::next_deadline`],
//! arranges to be woken, then drains [`TimerQueue::pop_due`]. Cancelling a
//! timer that already fired or was already cancelled is a no-op.

use std::collections::{BTreeMap, HashMap};

use core::time::Duration;

/// Handle of a scheduled timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Timers carrying a payload `T`, fired in deadline order (ties in scheduling order).
#[derive(Clone, Debug)]
pub struct TimerQueue<T> {
    queue: BTreeMap<(Duration, TimerId), T>,
    deadlines: HashMap<TimerId, Duration>,
    next: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
            next: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `at`.
    pub fn schedule(&mut self, at: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next);
        self.next += 1;
        self.queue.insert((at, id), payload);
        self.deadlines.insert(id, at);
        id
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(at) = self.deadlines.remove(&id) else {
            return false;
        };
        self.queue.remove(&(at, id));
        true
    }

    /// Whether `id` is still waiting to fire.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Deadline of `id`, if pending.
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.deadlines.get(&id).copied()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let entry = self.queue.first_entry()?;
        if entry.key().0 > now {
            return None;
        }
        let ((_, id), payload) = entry.remove_entry();
        self.deadlines.remove(&id);
        Some((id, payload))
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
