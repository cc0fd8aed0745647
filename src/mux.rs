//! Single-in-flight request multiplexer.
//!
//! CSAFE responses carry no request identifier, so they are matched to
//! requests purely by order: one frame is outstanding at a time and the next
//! queued request is transmitted only after the current one resolves, fails or
//! times out.
//!
//! All state lives in [`Driver`], which runs as one task and handles one event
//! at a time. [`Multiplexer`] is the cloneable handle used by callers. A
//! transport's receive path should hold a [`WeakMultiplexer`] so that it does
//! not keep the driver alive on its own.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, trace, warn};

use crate::codec::hex;
use crate::error::{Error, Result, TransportError};
use crate::frame::{DEFAULT_PACKET_SIZE, Reassembler, Response, build_frame, fragment, parse_frame};
use crate::proto::Command;
use crate::stats::LinkStats;
use crate::transport::Transport;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxConfig {
    /// Deadline for each request, counted from `send()`.
    pub timeout: Duration,
    /// Largest packet handed to the transport.
    pub max_packet_size: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_packet_size: DEFAULT_PACKET_SIZE,
        }
    }
}

impl MuxConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size.max(1);
        self
    }
}

enum Event {
    Send(Pending),
    Inbound(std::result::Result<Vec<u8>, TransportError>),
    Stats(oneshot::Sender<LinkStats>),
}

struct Pending {
    commands: Vec<Command>,
    deadline: Instant,
    reply: oneshot::Sender<Result<Response>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    /// The head of the queue has been transmitted.
    Busy,
}

enum Step {
    Event(Option<Event>),
    Expired,
}

/// Completion of one `send()`. Dropping it does not withdraw the request.
#[must_use = "the request is sent regardless; await the ticket to get the response"]
pub struct Ticket {
    rx: oneshot::Receiver<Result<Response>>,
}

impl Future for Ticket {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(Error::Closed)))
    }
}

#[derive(Clone)]
pub struct Multiplexer {
    events: mpsc::UnboundedSender<Event>,
    timeout: Duration,
}

impl Multiplexer {
    /// Build a handle and the driver that owns the link. The driver does
    /// nothing until [`Driver::run`] is polled.
    pub fn new<T: Transport>(transport: T, config: MuxConfig) -> (Self, Driver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver {
            transport,
            config,
            events: rx,
            queue: VecDeque::new(),
            state: State::Ready,
            reassembler: Reassembler::new(),
            stats: LinkStats::default(),
        };
        (
            Self {
                events: tx,
                timeout: config.timeout,
            },
            driver,
        )
    }

    /// [`Multiplexer::new`] with the driver spawned on the current runtime.
    pub fn spawn<T>(transport: T, config: MuxConfig) -> (Self, JoinHandle<LinkStats>)
    where
        T: Transport + Send + 'static,
    {
        let (mux, driver) = Self::new(transport, config);
        (mux, tokio::spawn(driver.run()))
    }

    /// Queue `commands` to go out as one frame. The request's deadline starts
    /// now, not when it reaches the head of the queue.
    pub fn send<I>(&self, commands: I) -> Ticket
    where
        I: IntoIterator<Item = Command>,
    {
        let (reply, rx) = oneshot::channel();
        let pending = Pending {
            commands: commands.into_iter().collect(),
            deadline: Instant::now() + self.timeout,
            reply,
        };
        if self.events.send(Event::Send(pending)).is_err() {
            debug!("[mux] send after driver shut down");
        }
        Ticket { rx }
    }

    /// Entry point for the transport: one inbound packet, or a link error.
    pub fn receive(&self, inbound: std::result::Result<Vec<u8>, TransportError>) {
        if self.events.send(Event::Inbound(inbound)).is_err() {
            trace!("[mux] inbound data after driver shut down");
        }
    }

    /// True once the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// A handle that does not count towards keeping the driver running.
    pub fn downgrade(&self) -> WeakMultiplexer {
        WeakMultiplexer {
            events: self.events.downgrade(),
            timeout: self.timeout,
        }
    }

    pub async fn stats(&self) -> Result<LinkStats> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Stats(tx))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)
    }
}

/// Non-owning [`Multiplexer`] handle, for receive paths.
#[derive(Clone)]
pub struct WeakMultiplexer {
    events: mpsc::WeakUnboundedSender<Event>,
    timeout: Duration,
}

impl WeakMultiplexer {
    /// `None` once every [`Multiplexer`] handle has been dropped.
    pub fn upgrade(&self) -> Option<Multiplexer> {
        let mux = Multiplexer {
            events: self.events.upgrade()?,
            timeout: self.timeout,
        };
        (!mux.is_closed()).then_some(mux)
    }
}

pub struct Driver<T> {
    transport: T,
    config: MuxConfig,
    events: mpsc::UnboundedReceiver<Event>,
    queue: VecDeque<Pending>,
    state: State,
    reassembler: Reassembler,
    stats: LinkStats,
}

impl<T: Transport> Driver<T> {
    /// Serve events until every [`Multiplexer`] handle is dropped. Requests
    /// still queued at that point fail with [`Error::Closed`].
    pub async fn run(mut self) -> LinkStats {
        loop {
            let deadline = match self.state {
                State::Busy => self.queue.front().map(|p| p.deadline),
                State::Ready => None,
            };
            let timer = sleep_until(deadline.unwrap_or_else(Instant::now));

            let step = tokio::select! {
                biased;
                _ = timer, if deadline.is_some() => Step::Expired,
                event = self.events.recv() => Step::Event(event),
            };

            match step {
                Step::Event(Some(event)) => {
                    // a chunk that lands after the deadline must not complete the request
                    if self.in_flight_overdue() {
                        self.expire_in_flight().await;
                    }
                    self.handle(event).await
                }
                Step::Event(None) => break,
                Step::Expired => self.expire_in_flight().await,
            }
        }

        for pending in self.queue.drain(..) {
            let _ = pending.reply.send(Err(Error::Closed));
        }
        self.stats
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::Send(pending) => {
                self.stats.inc_requests();
                self.queue.push_back(pending);
                self.attempt_send().await;
            }
            Event::Inbound(Err(err)) => {
                if self.state == State::Busy {
                    self.finish(Err(err.into()));
                } else {
                    warn!("[mux] transport error with nothing in flight: {}", err);
                }
                self.attempt_send().await;
            }
            Event::Inbound(Ok(chunk)) => self.on_chunk(&chunk).await,
            Event::Stats(reply) => {
                let mut snapshot = self.stats.clone();
                snapshot.queued = match self.state {
                    State::Busy => self.queue.len().saturating_sub(1),
                    State::Ready => self.queue.len(),
                };
                let _ = reply.send(snapshot);
            }
        }
    }

    async fn on_chunk(&mut self, chunk: &[u8]) {
        self.stats.add_rx(chunk.len());
        debug!("[rx] {}", hex(chunk));

        let outcome = match self.reassembler.push(chunk) {
            Ok(None) => return,
            Ok(Some(frame)) => parse_frame(&frame),
            Err(err) => Err(err.into()),
        };

        if self.state == State::Busy {
            self.finish(outcome);
        } else {
            match outcome {
                Ok(response) => {
                    self.stats.inc_unexpected();
                    warn!("[mux] dropping unexpected frame: {}", response);
                }
                Err(err) => warn!("[mux] dropping bad frame with nothing in flight: {}", err),
            }
        }
        self.attempt_send().await;
    }

    /// Transmit the head of the queue unless a request is already in flight.
    async fn attempt_send(&mut self) {
        while self.state == State::Ready {
            self.expire_overdue();
            let Some(head) = self.queue.front() else {
                return;
            };
            self.state = State::Busy;
            let frame = build_frame(&head.commands);
            let deadline = head.deadline;
            debug!("[tx] frame {}", hex(&frame));

            let written = timeout_at(deadline, self.write_frame(&frame)).await;
            match written {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.finish(Err(err.into())),
                Err(_) => {
                    warn!("[mux] deadline passed while writing frame");
                    self.finish(Err(Error::Timeout(self.config.timeout)));
                }
            }
        }
    }

    async fn write_frame(&mut self, frame: &[u8]) -> std::result::Result<(), TransportError> {
        for packet in fragment(frame, self.config.max_packet_size) {
            trace!("[tx] packet {}", hex(packet));
            self.transport.write_packet(packet).await?;
            self.stats.add_tx(packet.len());
        }
        Ok(())
    }

    fn in_flight_overdue(&self) -> bool {
        self.state == State::Busy
            && self
                .queue
                .front()
                .is_some_and(|p| p.deadline <= Instant::now())
    }

    async fn expire_in_flight(&mut self) {
        warn!("[mux] no response within {:?}", self.config.timeout);
        if !self.reassembler.is_empty() {
            debug!("[mux] discarding partial response");
            self.reassembler.reset();
        }
        self.finish(Err(Error::Timeout(self.config.timeout)));
        self.attempt_send().await;
    }

    /// Reject queued requests whose deadline passed before they were sent.
    fn expire_overdue(&mut self) {
        let now = Instant::now();
        while self.state == State::Ready && self.queue.front().is_some_and(|p| p.deadline <= now) {
            self.finish(Err(Error::Timeout(self.config.timeout)));
        }
    }

    /// Complete the head of the queue and return to `Ready`.
    fn finish(&mut self, result: Result<Response>) {
        self.state = State::Ready;
        let Some(pending) = self.queue.pop_front() else {
            return;
        };
        match &result {
            Ok(response) => {
                self.stats.inc_ok();
                debug!("[mux] response {}", response);
            }
            Err(err) => {
                self.stats.record_failure(err);
                warn!("[mux] request failed: {}", err);
            }
        }
        if pending.reply.send(result).is_err() {
            debug!("[mux] requester dropped its ticket");
        }
    }
}
