//! One-shot values pushed back to the control surface.
//!
//! Derived quantities (shape bounds) and optimizer results are queued as
//! events; the consumer drains the queue explicitly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One named value for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub name: String,
    pub value: f64,
}

impl FeedbackEvent {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// FIFO of pending feedback events.
#[derive(Debug, Clone, Default)]
pub struct FeedbackQueue {
    events: VecDeque<FeedbackEvent>,
}

impl FeedbackQueue {
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.events.push_back(FeedbackEvent::new(name, value));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take all pending events in push order.
    pub fn drain(&mut self) -> Vec<FeedbackEvent> {
        self.events.drain(..).collect()
    }

    /// Take all pending events keyed by name; later values win.
    pub fn drain_latest(&mut self) -> BTreeMap<String, f64> {
        self.drain().into_iter().map(|e| (e.name, e.value)).collect()
    }
}
