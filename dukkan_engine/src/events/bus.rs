//! Live event bus
//!
//! An in-process publish/subscribe registry feeding long-lived client streams (the `/events` SSE endpoint). The
//! registry is an explicit owned object, safe to share across connection-handling tasks.
//!
//! Publishing is fire-and-forget: each subscriber gets a bounded channel and a full or closed channel never blocks
//! the publisher. A failed write is logged and the subscriber is left registered; stale subscribers clean themselves
//! up when their connection closes and the [`Subscription`] guard drops.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
        PoisonError,
    },
};

use log::*;
use serde::Serialize;
use tokio::sync::mpsc;

const SUBSCRIBER_BUFFER: usize = 32;

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<HashMap<u64, mpsc::Sender<String>>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. The returned [`Subscription`] receives every event published after this call and
    /// unregisters itself when dropped.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock_subscribers().insert(id, sender);
        debug!("📡️ Subscriber #{id} registered on the event bus");
        Subscription { id, receiver, bus: self.clone() }
    }

    /// Serializes the event once and writes it to every currently registered subscriber. Returns the number of
    /// subscribers the event was handed to.
    pub fn publish<E: Serialize>(&self, event: &E) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!("📡️ Could not serialize event for the bus: {e}");
                return 0;
            },
        };
        let subscribers = self.lock_subscribers();
        let mut delivered = 0;
        for (id, sender) in subscribers.iter() {
            match sender.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("📡️ Subscriber #{id} is not keeping up; dropping event for it");
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Cleanup happens via the subscription guard, not here.
                    trace!("📡️ Subscriber #{id} has gone away");
                },
            }
        }
        trace!("📡️ Event delivered to {delivered} subscriber(s)");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn unregister(&self, id: u64) {
        self.lock_subscribers().remove(&id);
        debug!("📡️ Subscriber #{id} unregistered from the event bus");
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<u64, mpsc::Sender<String>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live handle to the event bus. Dropping it removes the subscriber from the registry.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<String>,
    bus: EventBus,
}

impl Subscription {
    /// The next published event, or `None` once the bus itself has gone away.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unregister(self.id);
    }
}
