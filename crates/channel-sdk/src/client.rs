//! Core channel client. Owns the WebSocket lifecycle, the outbound queue,
//! and the reconnect loop, and publishes everything through an [`EventBus`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use cb_domain::trace::TraceEvent;
use cb_protocol::{is_connection_established, ConnectionEstablished, NORMAL_CLOSURE};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::builder::ChannelClientBuilder;
use crate::events::{ChannelEvent, EventBus, EventKind, HandlerId};
use crate::reconnect::ReconnectBackoff;
use crate::types::{close_frame, ChannelError, CloseInfo, ConnectionState, Payload, ReadyState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A persistent, self-healing connection to the Combiner Service channel.
///
/// Create via [`ChannelClientBuilder`].  The handle is cheap to clone;
/// every clone drives the same connection.
#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: String,
    module_id: String,
    auto_reconnect: bool,
    backoff: ReconnectBackoff,
    close_timeout: Duration,
    events: EventBus,
    state: Mutex<State>,
}

struct State {
    phase: ConnectionState,
    manual_close: bool,
    reconnect_attempts: u32,
    /// Messages sent while not open, flushed in order on the next open.
    pending: VecDeque<Payload>,
    live: Option<LiveTransport>,
    /// Bumped on every connect; events from older transports are ignored.
    generation: u64,
}

struct LiveTransport {
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

impl ChannelClient {
    /// Start a new builder.
    pub fn builder(module_id: impl Into<String>) -> ChannelClientBuilder {
        ChannelClientBuilder::new(module_id)
    }

    pub(crate) fn new(builder: ChannelClientBuilder, endpoint: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                module_id: builder.module_id,
                auto_reconnect: builder.auto_reconnect,
                backoff: builder.backoff,
                close_timeout: builder.close_timeout,
                events: EventBus::new(),
                state: Mutex::new(State {
                    phase: ConnectionState::Disconnected,
                    manual_close: false,
                    reconnect_attempts: 0,
                    pending: VecDeque::new(),
                    live: None,
                    generation: 0,
                }),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the channel.  Resolves once the transport is open.
    ///
    /// Returns `Ok(())` immediately when already connecting or open.  An
    /// attempt still in flight after [`disconnect`](Self::disconnect) is
    /// re-armed rather than abandoned.  A failed attempt emits `error` then `close`, schedules a reconnect
    /// (unless disabled), and returns the transport error.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        Inner::connect(&self.inner).await
    }

    /// Close the channel with a normal-closure code and no reason.
    pub fn disconnect(&self) {
        self.disconnect_with(NORMAL_CLOSURE, "");
    }

    /// Close the channel and suppress automatic reconnection until the
    /// next explicit [`connect`](Self::connect).
    ///
    /// If the peer does not answer the close frame within the configured
    /// close timeout, the transport is dropped and `close` is emitted with
    /// an abnormal code.
    pub fn disconnect_with(&self, code: u16, reason: impl Into<String>) {
        let (closing, generation) = {
            let mut st = self.inner.state.lock();
            st.manual_close = true;

            let closing = match (&st.live, st.phase) {
                (Some(live), ConnectionState::Open) => {
                    let frame = close_frame(code, reason.into());
                    live.outbound.send(Message::Close(Some(frame))).is_ok()
                }
                _ => false,
            };
            if closing {
                st.phase = ConnectionState::Closing;
            }
            (closing, st.generation)
        };
        if closing {
            self.inner.arm_close_timeout(generation);
        }
        tracing::info!(
            endpoint = %self.inner.endpoint,
            code,
            closing,
            "disconnect requested"
        );
    }

    // ── Messaging ────────────────────────────────────────────────────

    /// Send a payload, or queue it until the channel is next open.
    ///
    /// Never blocks and never fails: delivery is fire-and-forget.
    pub fn send(&self, payload: impl Into<Payload>) {
        let payload = payload.into();
        let mut st = self.inner.state.lock();

        if st.phase == ConnectionState::Open {
            if let Some(live) = st.live.as_ref().filter(|l| !l.outbound.is_closed()) {
                let _ = live.outbound.send(payload.into_message());
                return;
            }
        }

        st.pending.push_back(payload);
        tracing::trace!(pending = st.pending.len(), "channel not open, message queued");
    }

    /// Serialize `value` as JSON and [`send`](Self::send) it.
    pub fn send_json<T: Serialize + fmt::Debug + ?Sized>(&self, value: &T) {
        self.send(Payload::json(value));
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Subscribe to an event channel.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    /// Remove a subscription made with [`on`](Self::on).
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.inner.events.off(kind, id)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Raw state of the live transport, or `None` when there is none.
    pub fn ready_state(&self) -> Option<ReadyState> {
        match self.inner.state.lock().phase {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting => Some(ReadyState::Connecting),
            ConnectionState::Open => Some(ReadyState::Open),
            ConnectionState::Closing => Some(ReadyState::Closing),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().phase
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect_attempts
    }

    /// Number of messages waiting for the next open.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn module_id(&self) -> &str {
        &self.inner.module_id
    }
}

impl fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelClient")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection internals
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl Inner {
    async fn connect(self: &Arc<Self>) -> Result<(), ChannelError> {
        let generation = {
            let mut st = self.state.lock();
            match st.phase {
                ConnectionState::Connecting => {
                    // Keep the in-flight attempt, even if disconnect() marked it.
                    st.manual_close = false;
                    tracing::debug!("connect() joined the attempt in flight");
                    return Ok(());
                }
                ConnectionState::Open => {
                    tracing::debug!("connect() ignored, already open");
                    return Ok(());
                }
                ConnectionState::Closing => {
                    // Replace the transport that is still shutting down.
                    if let Some(old) = st.live.take() {
                        old.cancel.cancel();
                    }
                }
                ConnectionState::Disconnected => {}
            }
            st.manual_close = false;
            st.phase = ConnectionState::Connecting;
            st.generation += 1;
            st.generation
        };

        tracing::info!(
            endpoint = %self.endpoint,
            module_id = %self.module_id,
            "connecting to combiner channel"
        );

        let mut ws = match tokio_tungstenite::connect_async(self.endpoint.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(endpoint = %self.endpoint, error = %message, "channel connect failed");
                self.events.emit(&ChannelEvent::Error(message.clone()));
                self.handle_close(generation, CloseInfo::abnormal(message.clone()));
                return Err(ChannelError::WebSocket(message));
            }
        };

        let abandoned = {
            let mut st = self.state.lock();
            let current = st.generation == generation;
            if current && st.manual_close {
                st.phase = ConnectionState::Disconnected;
            }
            !current || st.manual_close
        };
        if abandoned {
            tracing::info!(endpoint = %self.endpoint, "connect abandoned after disconnect()");
            let _ = ws.close(Some(close_frame(NORMAL_CLOSURE, String::new()))).await;
            return Err(ChannelError::Cancelled);
        }

        let (sink, stream) = ws.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
        let cancel = CancellationToken::new();

        let flushed = {
            let mut st = self.state.lock();
            st.phase = ConnectionState::Open;
            st.reconnect_attempts = 0;
            let pending = std::mem::take(&mut st.pending);
            let flushed = pending.len();
            for payload in pending {
                let _ = outbound_tx.send(payload.into_message());
            }
            st.live = Some(LiveTransport {
                outbound: outbound_tx,
                cancel: cancel.clone(),
            });
            flushed
        };

        tokio::spawn(write_loop(sink, outbound_rx, cancel.clone()));

        TraceEvent::ChannelOpened {
            endpoint: self.endpoint.clone(),
            flushed,
        }
        .emit();
        tracing::info!(endpoint = %self.endpoint, flushed, "channel open");
        self.events.emit(&ChannelEvent::Open);

        // Reader starts after `open` so subscribers never see a message first.
        tokio::spawn(Inner::read_loop(Arc::clone(self), generation, stream, cancel));
        Ok(())
    }

    async fn read_loop(
        self: Arc<Self>,
        generation: u64,
        mut stream: SplitStream<WsStream>,
        cancel: CancellationToken,
    ) {
        let mut close = CloseInfo::abnormal("connection dropped");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(Message::Text(text))) => self.dispatch_inbound(Payload::Text(text)),
                Some(Ok(Message::Binary(bytes))) => self.dispatch_inbound(Payload::Binary(bytes)),
                Some(Ok(Message::Close(frame))) => {
                    close = CloseInfo::from_frame(frame);
                    tracing::debug!(code = close.code, "close frame received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, "channel transport error");
                    self.events.emit(&ChannelEvent::Error(message.clone()));
                    if !close.was_clean {
                        close = CloseInfo::abnormal(message);
                    }
                    break;
                }
                None => break,
            }
        }

        cancel.cancel();
        self.handle_close(generation, close);
    }

    fn dispatch_inbound(&self, payload: Payload) {
        let parsed = payload.parse_json();
        self.events.emit(&ChannelEvent::Message(payload));

        let Some(value) = parsed else {
            return;
        };
        if is_connection_established(&value) {
            match serde_json::from_value::<ConnectionEstablished>(value.clone()) {
                Ok(greeting) => {
                    self.events
                        .emit(&ChannelEvent::ConnectionEstablished(greeting));
                }
                Err(e) => tracing::debug!(error = %e, "malformed connection greeting"),
            }
        }
        self.events.emit(&ChannelEvent::Json(value));
    }

    /// Drop the transport of `generation` if it is still waiting for the
    /// peer's close frame once the close timeout elapses.
    fn arm_close_timeout(self: &Arc<Self>, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, close handshake left unbounded");
            return;
        };
        let weak: Weak<Inner> = Arc::downgrade(self);
        let timeout = self.close_timeout;
        runtime.spawn(async move {
            tokio::time::sleep(timeout).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut st = inner.state.lock();
                if st.generation != generation || st.phase != ConnectionState::Closing {
                    return;
                }
                if let Some(live) = st.live.take() {
                    live.cancel.cancel();
                }
            }
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                endpoint = %inner.endpoint,
                timeout_ms,
                "peer did not answer close frame, dropping transport"
            );
            inner.handle_close(generation, CloseInfo::abnormal("close handshake timed out"));
        });
    }

    fn handle_close(self: &Arc<Self>, generation: u64, info: CloseInfo) {
        let (reconnect, manual) = {
            let mut st = self.state.lock();
            if st.generation != generation {
                tracing::trace!(generation, "ignoring close of a superseded transport");
                return;
            }
            if st.phase == ConnectionState::Disconnected {
                tracing::trace!(generation, "close already reported");
                return;
            }
            st.live = None;
            st.phase = ConnectionState::Disconnected;
            (!st.manual_close && self.auto_reconnect, st.manual_close)
        };

        TraceEvent::ChannelClosed {
            endpoint: self.endpoint.clone(),
            code: info.code,
            manual,
        }
        .emit();
        tracing::info!(
            endpoint = %self.endpoint,
            code = info.code,
            reason = %info.reason,
            manual,
            "channel closed"
        );
        self.events.emit(&ChannelEvent::Close(info));

        if reconnect {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let (attempt, delay) = {
            let mut st = self.state.lock();
            if self.backoff.should_give_up(st.reconnect_attempts) {
                tracing::debug!(
                    attempts = st.reconnect_attempts,
                    "reconnect attempts exhausted, staying disconnected"
                );
                return;
            }
            st.reconnect_attempts += 1;
            let attempt = st.reconnect_attempts;
            (attempt, self.backoff.delay_for_attempt(attempt))
        };

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        TraceEvent::ChannelReconnectScheduled {
            endpoint: self.endpoint.clone(),
            attempt,
            delay_ms,
        }
        .emit();
        tracing::info!(endpoint = %self.endpoint, attempt, delay_ms, "reconnecting");
        self.events
            .emit(&ChannelEvent::Reconnecting { attempt, delay });

        let weak: Weak<Inner> = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let suppressed = inner.state.lock().manual_close;
            if suppressed {
                tracing::debug!(attempt, "reconnect suppressed by disconnect()");
                return;
            }
            if let Err(e) = Inner::connect(&inner).await {
                tracing::debug!(attempt, error = %e, "reconnect attempt failed");
            }
        });
    }
}

/// Drain the outbound queue into the socket until cancelled, the queue
/// closes, or a close frame has been written.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = outbound.recv() => msg,
        };
        let Some(msg) = msg else {
            break;
        };
        let is_close = matches!(msg, Message::Close(_));
        if let Err(e) = sink.send(msg).await {
            tracing::debug!(error = %e, "channel write failed");
            break;
        }
        if is_close {
            break;
        }
    }
}
