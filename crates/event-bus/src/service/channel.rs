//! # Channel Registry
//!
//! One channel per event name, created on the first subscription and
//! removed when the last one goes away. Each channel keeps the most recently
//! delivered event and replays it to new subscribers.
//!
//! Channels carry an epoch. A subscription remembers the epoch it joined,
//! so releasing it after the channel was torn down and recreated leaves the
//! new channel alone.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::Event;
use crate::ports::{Direction, EventLogger, LogLevel};

pub(crate) type SubscriberId = u64;

struct Channel {
    epoch: u64,
    last: Option<Event>,
    subscribers: Vec<(SubscriberId, mpsc::UnboundedSender<Event>)>,
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Channel>,
    next_epoch: u64,
    next_subscriber: SubscriberId,
}

/// Handle returned by [`ChannelRegistry::join`].
pub(crate) struct Membership {
    pub id: SubscriberId,
    pub epoch: u64,
    pub receiver: mpsc::UnboundedReceiver<Event>,
}

/// Result of pushing one event onto a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub delivered: usize,
    pub closed: usize,
}

pub(crate) struct ChannelRegistry {
    inner: Mutex<Registry>,
    logger: Arc<dyn EventLogger>,
}

impl ChannelRegistry {
    pub(crate) fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            logger,
        }
    }

    /// Add a subscriber to `name`, creating the channel if needed. The last
    /// delivered event, if any, is already queued on the returned receiver.
    pub(crate) fn join(&self, name: &str) -> Membership {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut guard = self.inner.lock();
        let Registry {
            channels,
            next_epoch,
            next_subscriber,
        } = &mut *guard;

        *next_subscriber += 1;
        let id = *next_subscriber;
        let channel = channels.entry(name.to_string()).or_insert_with(|| {
            *next_epoch += 1;
            debug!(event = name, epoch = *next_epoch, "Channel created");
            Channel {
                epoch: *next_epoch,
                last: None,
                subscribers: Vec::new(),
            }
        });

        if let Some(last) = &channel.last {
            let _ = sender.send(last.clone());
        }
        channel.subscribers.push((id, sender));

        Membership {
            id,
            epoch: channel.epoch,
            receiver,
        }
    }

    /// Drop one subscriber; the channel goes with its last subscriber.
    pub(crate) fn leave(&self, name: &str, epoch: u64, id: SubscriberId) {
        let removed = {
            let mut registry = self.inner.lock();
            let Some(channel) = registry.channels.get_mut(name) else {
                return;
            };
            if channel.epoch != epoch {
                return;
            }
            channel.subscribers.retain(|(sid, _)| *sid != id);
            if channel.subscribers.is_empty() {
                registry.channels.remove(name);
                true
            } else {
                false
            }
        };

        if removed {
            self.logger.handle(
                "Cleanup",
                &json!({ "eventName": name }),
                Direction::Emit,
                LogLevel::Info,
            );
        }
    }

    /// Push `event` to every subscriber of its channel and remember it for
    /// replay. `None` when no channel exists for the name.
    pub(crate) fn publish(&self, event: &Event) -> Option<Delivery> {
        let mut registry = self.inner.lock();
        let channel = registry.channels.get_mut(&event.name)?;

        channel.last = Some(event.clone());
        let before = channel.subscribers.len();
        channel
            .subscribers
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
        let delivered = channel.subscribers.len();

        if channel.subscribers.is_empty() {
            registry.channels.remove(&event.name);
        }

        Some(Delivery {
            delivered,
            closed: before - delivered,
        })
    }

    /// Tear down the channel for `name`. Its subscribers see the end of
    /// their stream once they have consumed what was already sent.
    pub(crate) fn close(&self, name: &str) -> bool {
        self.inner.lock().channels.remove(name).is_some()
    }

    pub(crate) fn subscriber_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .channels
            .get(name)
            .map_or(0, |channel| channel.subscribers.len())
    }

    pub(crate) fn has_channel(&self, name: &str) -> bool {
        self.inner.lock().channels.contains_key(name)
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.inner.lock().channels.len()
    }
}
