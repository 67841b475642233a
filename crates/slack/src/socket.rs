use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api::SlackWebApi;
use crate::commands::{CommandInvocation, CommandRouter, SummaryService};
use crate::events::{decode_frame, Frame, SocketEnvelope, SocketEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_frame(&self) -> Result<Option<Frame>, TransportError>;
    async fn acknowledge(
        &self,
        envelope_id: &str,
        payload_text: Option<&str>,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
    fn is_connected(&self) -> bool;
}

/// Single-use acknowledgment for one envelope. The consuming methods take
/// `self`, so a second ack for the same envelope does not compile.
pub struct AckHandle {
    envelope_id: String,
    transport: Arc<dyn SocketTransport>,
}

impl AckHandle {
    pub fn new(envelope_id: String, transport: Arc<dyn SocketTransport>) -> Self {
        Self { envelope_id, transport }
    }

    pub fn envelope_id(&self) -> &str {
        &self.envelope_id
    }

    /// Acknowledges the envelope with no visible response.
    pub async fn ack(self) -> Result<(), TransportError> {
        self.transport.acknowledge(&self.envelope_id, None).await
    }

    /// Acknowledges the envelope with text Slack shows to the caller only.
    pub async fn ack_with_text(self, text: &str) -> Result<(), TransportError> {
        self.transport.acknowledge(&self.envelope_id, Some(text)).await
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle").field("envelope_id", &self.envelope_id).finish_non_exhaustive()
    }
}

enum PumpExit {
    /// The transport stream ended without a server-directed reconnect.
    StreamClosed,
    /// The server sent a `disconnect` frame; reconnect with a fresh URL.
    Disconnected,
}

/// Owns the long-lived Socket Mode session: connects, pumps frames, hands
/// slash command envelopes to the router, and reconnects on failure.
pub struct SocketModeRunner<S> {
    transport: Arc<dyn SocketTransport>,
    router: Arc<CommandRouter<S>>,
    reconnect_policy: ReconnectPolicy,
}

impl<S> SocketModeRunner<S>
where
    S: SummaryService + 'static,
{
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        router: Arc<CommandRouter<S>>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, router, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut attempt: u32 = 0;

        loop {
            match self.connect_and_pump(&mut attempt).await {
                Ok(PumpExit::StreamClosed) => return Ok(()),
                Ok(PumpExit::Disconnected) => {
                    // Server-directed reconnects are routine refreshes, not
                    // failures; the retry budget starts over.
                    attempt = 0;
                }
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn connect_and_pump(&self, attempt: &mut u32) -> Result<PumpExit, TransportError> {
        info!(attempt = *attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt = *attempt, "socket mode transport connected");

        loop {
            let Some(frame) = self.transport.next_frame().await? else {
                info!("socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(PumpExit::StreamClosed);
            };

            match frame {
                Frame::Hello => {
                    info!(event_name = "socket.hello", "socket mode session established");
                    // A hello marks a healthy session; the retry budget only
                    // counts consecutive failures.
                    *attempt = 0;
                }
                Frame::Disconnect { reason } => {
                    info!(
                        event_name = "socket.disconnect",
                        reason = reason.as_deref().unwrap_or("unspecified"),
                        "server requested reconnect"
                    );
                    self.transport.disconnect().await?;
                    return Ok(PumpExit::Disconnected);
                }
                Frame::Envelope(envelope) => self.dispatch_envelope(envelope).await,
                Frame::Unsupported { frame_type } => {
                    // No envelope id, so there is nothing to acknowledge.
                    debug!(
                        event_name = "socket.frame_ignored",
                        frame_type = %frame_type,
                        "ignoring unsupported control frame"
                    );
                }
            }
        }
    }

    async fn dispatch_envelope(&self, envelope: SocketEnvelope) {
        let SocketEnvelope { envelope_id, event } = envelope;

        match event {
            SocketEvent::SlashCommand(payload) => {
                info!(
                    event_name = "socket.envelope_received",
                    envelope_id = %envelope_id,
                    command = %payload.command,
                    channel_id = %payload.channel_id,
                    "received slash command envelope"
                );

                let invocation = CommandInvocation {
                    channel_id: payload.channel_id,
                    user_id: payload.user_id,
                    text: payload.text,
                    ack: AckHandle::new(envelope_id, self.transport.clone()),
                };
                let router = self.router.clone();

                // One task per envelope; a slow digest never stalls the pump.
                tokio::spawn(async move {
                    let outcome = router.route(invocation).await;
                    debug!(
                        event_name = "socket.envelope_routed",
                        outcome = ?outcome,
                        "slash command routed"
                    );
                });
            }
            SocketEvent::Unsupported { event_type } => {
                // Unacked envelopes get re-delivered; ack what we ignore so
                // the queue stays quiet.
                debug!(
                    event_name = "socket.envelope_ignored",
                    envelope_id = %envelope_id,
                    event_type = %event_type,
                    "ignoring unsupported envelope type"
                );
                if let Err(error) = self.transport.acknowledge(&envelope_id, None).await {
                    warn!(
                        envelope_id = %envelope_id,
                        error = %error,
                        "failed to acknowledge ignored envelope"
                    );
                }
            }
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct AckFrame {
    envelope_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<AckPayload>,
}

#[derive(Serialize)]
struct AckPayload {
    text: String,
}

/// Live Socket Mode transport. Requests a fresh websocket URL for every
/// connect, answers pings, and serializes acks back over the write half.
pub struct WebsocketTransport {
    api: SlackWebApi,
    connected: AtomicBool,
    write: Mutex<Option<SplitSink<WsStream, Message>>>,
    read: Mutex<Option<SplitStream<WsStream>>>,
}

impl WebsocketTransport {
    pub fn new(api: SlackWebApi) -> Self {
        Self {
            api,
            connected: AtomicBool::new(false),
            write: Mutex::new(None),
            read: Mutex::new(None),
        }
    }

    async fn send_message(&self, message: Message) -> Result<(), tungstenite::Error> {
        let mut guard = self.write.lock().await;
        let Some(write) = guard.as_mut() else {
            return Err(tungstenite::Error::ConnectionClosed);
        };
        write.send(message).await
    }
}

#[async_trait]
impl SocketTransport for WebsocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .connections_open()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        let (write, read) = stream.split();

        *self.write.lock().await = Some(write);
        *self.read.lock().await = Some(read);
        self.connected.store(true, Ordering::SeqCst);

        Ok(())
    }

    async fn next_frame(&self) -> Result<Option<Frame>, TransportError> {
        loop {
            let message = {
                let mut guard = self.read.lock().await;
                let Some(read) = guard.as_mut() else {
                    return Err(TransportError::Receive(
                        "transport is not connected".to_string(),
                    ));
                };
                read.next().await
            };

            match message {
                Some(Ok(Message::Text(raw))) => {
                    if let Some(frame) = classify_message(&raw) {
                        return Ok(Some(frame));
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    self.send_message(Message::Pong(payload))
                        .await
                        .map_err(|err| TransportError::Receive(err.to_string()))?;
                }
                // An abrupt close without a preceding `disconnect` frame is a
                // failure, not a shutdown; surfacing an error keeps the
                // runner in its reconnect loop.
                Some(Ok(Message::Close(close))) => {
                    self.connected.store(false, Ordering::SeqCst);
                    let reason = close
                        .map(|frame| frame.reason.into_owned())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "server closed the stream".to_string());
                    return Err(TransportError::Receive(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::Receive(err.to_string()));
                }
                None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::Receive(
                        "stream ended without a close frame".to_string(),
                    ));
                }
            }
        }
    }

    async fn acknowledge(
        &self,
        envelope_id: &str,
        payload_text: Option<&str>,
    ) -> Result<(), TransportError> {
        let ack = AckFrame {
            envelope_id: envelope_id.to_string(),
            payload: payload_text.map(|text| AckPayload { text: text.to_string() }),
        };
        let raw = serde_json::to_string(&ack)
            .map_err(|err| TransportError::Acknowledge(err.to_string()))?;

        self.send_message(Message::Text(raw))
            .await
            .map_err(|err| TransportError::Acknowledge(err.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);

        if let Err(err) = self.send_message(Message::Close(None)).await {
            debug!(error = %err, "close frame could not be sent");
        }
        *self.write.lock().await = None;
        *self.read.lock().await = None;

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

fn classify_message(raw: &str) -> Option<Frame> {
    match decode_frame(raw) {
        Ok(frame) => Some(frame),
        Err(error) => {
            warn!(
                event_name = "socket.frame_dropped",
                error = %error,
                "dropping malformed socket frame"
            );
            None
        }
    }
}
