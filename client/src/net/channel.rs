//! Realtime channel seam.
//!
//! A [`ChannelConnector`] opens one bidirectional text channel per chat
//! session. The channel reports its lifecycle and inbound text through a
//! [`ChannelSink`], tagged with the session generation that opened it, so the
//! session manager can drop events from channels it has already abandoned.
//!
//! Connectors must never emit events synchronously from inside `connect`,
//! `send_text`, or `close`: the session manager is mid-update when it calls
//! them. Queue the event instead.

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;

use std::fmt::Display;
use std::pin::Pin;

use futures::Sink;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Monotonic counter identifying one session attempt.
pub type SessionGeneration = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to open chat channel: {0}")]
    Connect(String),
    #[error("chat channel is closed")]
    Closed,
}

/// Lifecycle and data events reported by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is ready for outbound frames.
    Opened,
    /// One inbound text frame.
    Text(String),
    /// The channel closed cleanly.
    Closed,
    /// The channel could not open or broke.
    Failed(String),
}

/// A channel event tagged with the generation of the channel that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNotice {
    pub generation: SessionGeneration,
    pub event: ChannelEvent,
}

/// Event sender handed to a connector for one channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    generation: SessionGeneration,
    tx: UnboundedSender<ChannelNotice>,
}

impl ChannelSink {
    pub fn new(generation: SessionGeneration, tx: UnboundedSender<ChannelNotice>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// Queue an event. Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: ChannelEvent) -> bool {
        self.tx
            .unbounded_send(ChannelNotice {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Event queue shared by every channel of one session manager.
pub fn channel_events() -> (UnboundedSender<ChannelNotice>, UnboundedReceiver<ChannelNotice>) {
    mpsc::unbounded()
}

/// Outbound half of an open channel.
pub trait RealtimeChannel {
    /// Queue one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel can no longer send.
    fn send_text(&self, text: String) -> Result<(), ChannelError>;

    /// Request closure. Fire-and-forget; never waits for the peer.
    fn close(&self);
}

/// Opens realtime channels against a fixed endpoint.
pub trait ChannelConnector {
    /// Begin opening a channel to `url`. Readiness is reported later as
    /// [`ChannelEvent::Opened`] through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Connect`] when the channel cannot even be
    /// requested (e.g. a malformed URL).
    fn connect(&self, url: &str, sink: ChannelSink) -> Result<Box<dyn RealtimeChannel>, ChannelError>;
}

/// Work item for a socket task's writer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// [`RealtimeChannel`] that forwards into a socket task through a queue.
#[derive(Debug)]
pub struct QueuedChannel {
    tx: UnboundedSender<Outbound>,
}

impl RealtimeChannel for QueuedChannel {
    fn send_text(&self, text: String) -> Result<(), ChannelError> {
        self.tx
            .unbounded_send(Outbound::Text(text))
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&self) {
        let _ = self.tx.unbounded_send(Outbound::Close);
        self.tx.close_channel();
    }
}

/// Channel handle plus the queue a socket task drains.
pub fn outbound_queue() -> (QueuedChannel, UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded();
    (QueuedChannel { tx }, rx)
}

/// Wait for a socket's handshake, then report `Opened` or `Failed`.
///
/// Must run on the socket before it is split: a split sink reports ready
/// without asking the socket. A socket that closed during the handshake also
/// reports ready, so `is_open` decides between the two outcomes.
/// Returns whether the socket is open.
pub async fn announce_when_open<S, M>(socket: &mut S, is_open: impl FnOnce(&S) -> bool, sink: &ChannelSink) -> bool
where
    S: Sink<M> + Unpin,
    S::Error: Display,
{
    let ready = futures::future::poll_fn(|cx| Sink::<M>::poll_ready(Pin::new(&mut *socket), cx)).await;
    if let Err(e) = ready {
        sink.emit(ChannelEvent::Failed(e.to_string()));
        return false;
    }
    if !is_open(&*socket) {
        sink.emit(ChannelEvent::Failed("chat socket closed during handshake".to_owned()));
        return false;
    }
    sink.emit(ChannelEvent::Opened);
    true
}
