//! Lifecycle event broadcasting.
//!
//! Every container transition is logged through the `log` facade and
//! broadcast to subscribers, so a CLI, a test or a debug overlay can follow
//! containers as they load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::container::{ContainerId, Phase};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    /// Container concerned, `None` for page-wide events
    pub container: Option<ContainerId>,
    /// Phase the container entered, if this is a transition
    pub phase: Option<Phase>,
    pub level: EventLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            container: None,
            phase: None,
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    pub fn for_container(mut self, id: ContainerId) -> Self {
        self.container = Some(id);
        self
    }

    pub fn entering(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// Fans lifecycle events out to every subscriber.
pub struct EventBroadcaster {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Log an event and send it to all subscribers.
    pub fn emit(&self, event: LifecycleEvent) {
        let target = match event.container {
            Some(id) => format!("container {}", id),
            None => "page".to_string(),
        };
        match event.level {
            EventLevel::Info | EventLevel::Success => log::info!("[{}] {}", target, event.message),
            EventLevel::Warning => log::warn!("[{}] {}", target, event.message),
            EventLevel::Error => log::error!("[{}] {}", target, event.message),
        }

        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
