//! Replays a fixed list of events, optionally spaced out in time.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use midilink_core::{ControlEvent, ControlEventSource};

pub struct ScriptedSource {
    events: VecDeque<ControlEvent>,
    spacing: Duration,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = ControlEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            spacing: Duration::ZERO,
        }
    }

    /// Waits `spacing` before yielding each event.
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl ControlEventSource for ScriptedSource {
    async fn next_event(&mut self) -> Option<ControlEvent> {
        if !self.spacing.is_zero() && !self.events.is_empty() {
            tokio::time::sleep(self.spacing).await;
        }
        self.events.pop_front()
    }
}
