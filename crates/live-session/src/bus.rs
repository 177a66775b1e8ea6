//! The session event bus.
//!
//! One producer (the inbound task) publishes every decoded event; the bus
//! drops the vendor's handshake markers and buffers the rest for the single
//! consumer reading [`EventStream`]. The stream ends when the bus completes
//! and ends with one `Err` item when it fails. Either terminal transition
//! happens at most once.

use crate::{
    error::{LiveError, Result},
    flag::{OneShot, raised},
};
use futures::{
    Stream, StreamExt,
    stream::{self, BoxStream},
};
use live_types::{EventKind, LiveEvent};
use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};
use tokio::sync::{mpsc, watch};

/// What the bus does when the consumer falls behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Buffer without bound; the producer never waits.
    #[default]
    Grow,
    /// Hold at most `capacity` events; the producer waits for room.
    Block { capacity: usize },
    /// Hold at most `capacity` events; newer events are dropped while full.
    DropNewest { capacity: usize },
}

/// The outcome of one [`EventPublisher::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// A handshake marker; never forwarded.
    Filtered,
    /// The buffer was full under [`OverflowPolicy::DropNewest`].
    Dropped,
    /// The bus has terminated or the consumer went away.
    Closed,
}

enum Sender {
    Unbounded(mpsc::UnboundedSender<LiveEvent>),
    Bounded { tx: mpsc::Sender<LiveEvent>, drop_newest: bool },
}

enum Receiver {
    Unbounded(mpsc::UnboundedReceiver<LiveEvent>),
    Bounded(mpsc::Receiver<LiveEvent>),
}

impl Receiver {
    async fn recv(&mut self) -> Option<LiveEvent> {
        match self {
            Receiver::Unbounded(rx) => rx.recv().await,
            Receiver::Bounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<LiveEvent> {
        match self {
            Receiver::Unbounded(rx) => rx.try_recv().ok(),
            Receiver::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

struct Terminal {
    done: OneShot,
    signal: watch::Sender<bool>,
    error: Mutex<Option<LiveError>>,
}

impl Terminal {
    fn finish(&self, error: Option<LiveError>) -> bool {
        if !self.done.fire() {
            return false;
        }
        if let (Some(error), Ok(mut slot)) = (error, self.error.lock()) {
            *slot = Some(error);
        }
        self.signal.send_replace(true);
        true
    }

    fn take_error(&self) -> Option<LiveError> {
        self.error.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Ends the bus from outside the producer, e.g. when the session is closed.
#[derive(Clone)]
pub(crate) struct BusCloser(Arc<Terminal>);

impl BusCloser {
    /// Completes the stream. Returns `false` if the bus had already terminated.
    pub(crate) fn complete(&self) -> bool {
        self.0.finish(None)
    }

    /// Fails the stream with `error`. Returns `false` if the bus had already terminated.
    pub(crate) fn fail(&self, error: LiveError) -> bool {
        self.0.finish(Some(error))
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.0.done.is_fired()
    }
}

/// The producer half of the bus.
pub struct EventPublisher {
    tx: Sender,
    markers: &'static [EventKind],
    terminal: Arc<Terminal>,
}

impl EventPublisher {
    pub async fn publish(&self, event: LiveEvent) -> Delivery {
        if self.terminal.done.is_fired() {
            return Delivery::Closed;
        }
        if self.markers.contains(&event.kind()) {
            return Delivery::Filtered;
        }
        match &self.tx {
            Sender::Unbounded(tx) => match tx.send(event) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
            Sender::Bounded { tx, drop_newest: true } => match tx.try_send(event) {
                Ok(()) => Delivery::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            },
            Sender::Bounded { tx, drop_newest: false } => {
                // Waiting for room must not outlive the bus.
                let mut signal = self.terminal.signal.subscribe();
                tokio::select! {
                    sent = tx.send(event) => match sent {
                        Ok(()) => Delivery::Delivered,
                        Err(_) => Delivery::Closed,
                    },
                    _ = raised(&mut signal) => Delivery::Closed,
                }
            }
        }
    }

    pub(crate) fn closer(&self) -> BusCloser {
        BusCloser(self.terminal.clone())
    }
}

/// The session's public event stream.
///
/// Yields events in the order their frames arrived. A transport failure is
/// reported as a final `Err` item after every event buffered before it.
pub struct EventStream {
    inner: BoxStream<'static, Result<LiveEvent>>,
}

impl Stream for EventStream {
    type Item = Result<LiveEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

struct ConsumerState {
    rx: Receiver,
    terminal: Arc<Terminal>,
    signal: watch::Receiver<bool>,
}

enum Wake {
    Event(Option<LiveEvent>),
    Terminated,
}

/// Creates a bus that filters out `markers`.
pub fn channel(policy: OverflowPolicy, markers: &'static [EventKind]) -> (EventPublisher, EventStream) {
    let (tx, rx) = match policy {
        OverflowPolicy::Grow => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Sender::Unbounded(tx), Receiver::Unbounded(rx))
        }
        OverflowPolicy::Block { capacity } | OverflowPolicy::DropNewest { capacity } => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            let drop_newest = matches!(policy, OverflowPolicy::DropNewest { .. });
            (Sender::Bounded { tx, drop_newest }, Receiver::Bounded(rx))
        }
    };

    let (signal_tx, signal_rx) = watch::channel(false);
    let terminal = Arc::new(Terminal {
        done: OneShot::new(),
        signal: signal_tx,
        error: Mutex::new(None),
    });

    let state = ConsumerState {
        rx,
        terminal: terminal.clone(),
        signal: signal_rx,
    };
    let inner = stream::unfold(state, |mut state| async move {
        let wake = tokio::select! {
            biased;
            event = state.rx.recv() => Wake::Event(event),
            _ = raised(&mut state.signal) => Wake::Terminated,
        };
        match wake {
            Wake::Event(Some(event)) => Some((Ok(event), state)),
            // Drain what was buffered before the bus terminated.
            Wake::Event(None) | Wake::Terminated => match state.rx.try_recv() {
                Some(event) => Some((Ok(event), state)),
                None => state.terminal.take_error().map(|error| (Err(error), state)),
            },
        }
    })
    .fuse()
    .boxed();

    (
        EventPublisher {
            tx,
            markers,
            terminal,
        },
        EventStream { inner },
    )
}
