//! Progress notifier and broadcast bus.
//!
//! Delivery is fire-and-forget: `emit` never blocks and never fails the
//! caller. Slow subscribers lag and lose events rather than stalling a run.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::types::{ProgressEvent, ProgressStage};

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Sink for progress events.
///
/// Implementations must return promptly and swallow their own delivery
/// failures.
pub trait ProgressNotifier: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ProgressNotifier for NoopNotifier {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Shared reference to ProgressBus
pub type SharedProgressBus = Arc<ProgressBus>;

/// Broadcast bus fanning progress events out to any number of subscribers.
#[derive(Debug)]
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a shared reference to this bus
    pub fn shared(self) -> SharedProgressBus {
        Arc::new(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressBus {
    fn emit(&self, event: ProgressEvent) {
        let stage = event.stage;
        match self.sender.send(event) {
            Ok(count) => debug!(%stage, receivers = count, "Progress event published"),
            // No receivers is fine
            Err(_) => debug!(%stage, "Progress event published (no receivers)"),
        }
    }
}

impl<T: ProgressNotifier + ?Sized> ProgressNotifier for Arc<T> {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub run_id: Option<Uuid>,
    pub stages: Option<Vec<ProgressStage>>,
}

impl EventFilter {
    /// Matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn stages(mut self, stages: Vec<ProgressStage>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn matches(&self, event: &ProgressEvent) -> bool {
        if let Some(run_id) = self.run_id {
            if event.run_id != run_id {
                return false;
            }
        }
        if let Some(ref stages) = self.stages {
            if !stages.contains(&event.stage) {
                return false;
            }
        }
        true
    }
}

/// Receiver that only yields events matching its filter.
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<ProgressEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<ProgressEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<ProgressEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}
