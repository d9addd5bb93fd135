//! # Subscriptions
//!
//! Receiving side of the coordinator's channels.
//!
//! A [`Subscription`] is tied to one event name. Dropping it releases its
//! place in the channel, and the channel itself disappears with its last
//! subscription.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_stream::Stream;
use tracing::debug;

use crate::domain::Event;
use crate::service::channel::{ChannelRegistry, Membership, SubscriberId};

/// Predicate applied to events before they reach the subscriber.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was torn down or the subscription completed.
    #[error("Subscription closed")]
    Closed,
}

/// Stream of events for one event name.
pub struct Subscription {
    event_name: String,
    id: SubscriberId,
    epoch: u64,
    receiver: mpsc::UnboundedReceiver<Event>,
    filter: Option<EventFilter>,
    /// Items still allowed through; `None` means unlimited.
    remaining: Option<usize>,
    registry: Arc<ChannelRegistry>,
    released: bool,
}

impl Subscription {
    pub(crate) fn new(
        event_name: &str,
        membership: Membership,
        filter: Option<EventFilter>,
        limit: Option<usize>,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        Self {
            event_name: event_name.to_string(),
            id: membership.id,
            epoch: membership.epoch,
            receiver: membership.receiver,
            filter,
            remaining: limit,
            registry,
            released: false,
        }
    }

    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Whether no further events will be yielded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Receive the next event that passes the filter.
    ///
    /// `None` once the channel is closed or a `once` subscription has
    /// delivered its event.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if self.is_finished() {
                return None;
            }
            let event = self.receiver.recv().await?;
            if let Some(event) = self.accept(event) {
                return Some(event);
            }
        }
    }

    /// Receive without waiting.
    ///
    /// - `Ok(Some(event))`: an event was available and matched
    /// - `Ok(None)`: nothing available right now
    /// - `Err(SubscriptionError::Closed)`: the subscription is over
    pub fn try_recv(&mut self) -> Result<Option<Event>, SubscriptionError> {
        loop {
            if self.is_finished() {
                return Err(SubscriptionError::Closed);
            }
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(SubscriptionError::Closed),
            };
            if let Some(event) = self.accept(event) {
                return Ok(Some(event));
            }
        }
    }

    /// Leave the channel now instead of on drop.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn accept(&mut self, event: Event) -> Option<Event> {
        if let Some(filter) = &self.filter {
            if !filter(&event) {
                return None;
            }
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.release();
            }
        }
        Some(event)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.receiver.close();
        self.registry.leave(&self.event_name, self.epoch, self.id);
        debug!(event = %self.event_name, subscriber = self.id, "Subscription released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event_name", &self.event_name)
            .field("id", &self.id)
            .field("remaining", &self.remaining)
            .field("released", &self.released)
            .finish()
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.is_finished() {
                return Poll::Ready(None);
            }
            let event = match self.receiver.poll_recv(cx) {
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };
            if let Some(event) = self.accept(event) {
                return Poll::Ready(Some(event));
            }
        }
    }
}
