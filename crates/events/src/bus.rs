//! Publish/subscribe for committed events.
//!
//! Nothing reaches the bus before the event store accepted it, and the store is
//! what a consumer rebuilds from. Delivery is at-least-once with no ordering
//! across publishers, so consumers must skip what they already applied.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// One consumer's queue on a bus.
///
/// Gets a copy of every message published after `subscribe` returned. Drain it
/// from one thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Broadcast bus: every subscription sees every message.
///
/// `publish` can fail after the store append succeeded. The dispatcher reports
/// that as an error; the events themselves are safe in the store.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Publish in order, stopping at the first failure.
    fn publish_all<I>(&self, messages: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = M>,
        Self: Sized,
    {
        messages.into_iter().try_for_each(|m| self.publish(m))
    }
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
