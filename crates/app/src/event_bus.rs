//! Broadcast of bus events to in-process observers.
//!
//! The router and its services announce every reading, prediction, command,
//! status change, alert and suppressed echo here. The daemon's log task is
//! the usual subscriber.

use std::future::Future;

use tokio::sync::broadcast;

use homebus_domain::error::HomeBusError;
use homebus_domain::event::Event;

use crate::ports::EventPublisher;

/// [`EventPublisher`] fanning events out over a tokio [`broadcast`] channel.
///
/// Observers that fall more than `capacity` events behind lose the oldest
/// ones. Events announced while nobody listens are discarded.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Observe events announced from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HomeBusError>> + Send {
        // Sending only fails without receivers.
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}
