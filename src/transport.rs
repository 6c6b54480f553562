//! Transport manager: channel lifecycle state machine and send policy.
//!
//! ARCHITECTURE
//! ============
//! One activation owns one `Transport`. A driver task runs the channel
//! lifecycle (load, dial, pump, re-dial) and reports every step on a single
//! inbound event stream; `next_event` applies the state transition before
//! handing the event to the caller, so transitions and their UI side
//! effects stay independently testable.
//!
//! LIFECYCLE
//! =========
//! ```text
//! Uninitialized --activation--> LoadingChannel
//! LoadingChannel --library ready--> Connecting
//! LoadingChannel --load failure--> Disconnected   (terminal, no retry)
//! Connecting --connect ack--> Connected
//! Connected --disconnect--> Disconnected
//! Disconnected --auto re-dial--> Connecting
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channel::{ConnectParams, Connector};
use crate::config::{ResolvedConfig, WidgetOptions};
use crate::store::{ChatMessage, PreChatMetadata};
use crate::wire::{ClientEvent, InboundMessage};

/// Pause between a disconnect and the next dial attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Bounds of the simulated-reply delay, milliseconds.
pub const ECHO_DELAY_MIN_MS: u64 = 700;
pub const ECHO_DELAY_MAX_MS: u64 = 1400;

/// Lifecycle position of the realtime channel for this activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Uninitialized,
    LoadingChannel,
    Connecting,
    Connected,
    Disconnected,
}

/// One step of the channel lifecycle, reported by the driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel client library resolved.
    Ready,
    /// A re-dial attempt started.
    Connecting,
    /// The backend acknowledged the connection.
    Connected,
    /// An inbound message arrived.
    Message(InboundMessage),
    /// The connection dropped or a dial failed.
    Disconnected,
    /// The library load failed; terminal for this activation.
    LoadFailed(String),
}

/// Outcome of one outgoing message, per the send policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The reply endpoint answered with this text.
    Replied(String),
    /// Emitted over the channel; the reply arrives as a later event.
    AwaitingChannel,
    /// Locally synthesized reply (no backend reachable).
    Echoed(String),
    /// The reply endpoint failed; this text goes in the log as one inline
    /// system message.
    Failed(String),
}

/// Per-activation transport manager.
pub struct Transport {
    options: WidgetOptions,
    config: ResolvedConfig,
    http: reqwest::Client,
    state: TransportState,
    events: mpsc::Receiver<ChannelEvent>,
    events_tx: Option<mpsc::Sender<ChannelEvent>>,
    outbound: mpsc::Sender<ClientEvent>,
    outbound_rx: Option<mpsc::Receiver<ClientEvent>>,
}

impl Transport {
    #[must_use]
    pub fn new(options: WidgetOptions, config: ResolvedConfig) -> Self {
        let (events_tx, events) = mpsc::channel(32);
        let (outbound, outbound_rx) = mpsc::channel(32);
        Self {
            options,
            config,
            http: reqwest::Client::new(),
            state: TransportState::Uninitialized,
            events,
            events_tx: Some(events_tx),
            outbound,
            outbound_rx: Some(outbound_rx),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransportState {
        self.state
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Start the channel driver. One activation per transport; later calls
    /// are ignored.
    pub fn activate(&mut self, connector: Arc<dyn Connector>, params: ConnectParams) {
        if self.state != TransportState::Uninitialized {
            return;
        }
        let (Some(events_tx), Some(outbound_rx)) =
            (self.events_tx.take(), self.outbound_rx.take())
        else {
            return;
        };
        self.state = TransportState::LoadingChannel;
        tokio::spawn(drive_channel(connector, params, events_tx, outbound_rx));
    }

    /// Receive the next lifecycle event, applying its state transition.
    ///
    /// `None` once the driver has shut down and the stream is drained.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    fn apply(&mut self, event: &ChannelEvent) {
        use TransportState as S;
        let next = match (self.state, event) {
            (_, ChannelEvent::LoadFailed(_)) => S::Disconnected,
            (S::LoadingChannel, ChannelEvent::Ready) => S::Connecting,
            (S::Connecting, ChannelEvent::Connected) => S::Connected,
            (S::Connecting | S::Connected, ChannelEvent::Disconnected) => S::Disconnected,
            (S::Disconnected, ChannelEvent::Connecting) => S::Connecting,
            (state, _) => state,
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "channel state transition");
            self.state = next;
        }
    }

    /// Run one outgoing message through the send policy.
    ///
    /// `history` is the full conversation including the message being sent.
    pub async fn deliver(&self, text: &str, history: &[ChatMessage]) -> Delivery {
        if let Some(api_url) = self.options.api_url.clone() {
            return self.deliver_http(&api_url, text, history).await;
        }

        if self.state == TransportState::Connected {
            let event = ClientEvent::Message {
                text: text.to_owned(),
                owner_id: self.config.owner_id.clone(),
            };
            if self.outbound.send(event).await.is_ok() {
                return Delivery::AwaitingChannel;
            }
            // Channel went away under us; fall through to the echo path.
        }

        deliver_echo(text).await
    }

    async fn deliver_http(&self, api_url: &str, text: &str, history: &[ChatMessage]) -> Delivery {
        let body = match &self.options.payload {
            Some(build) => build(history),
            None => serde_json::json!({ "message": text }),
        };

        let mut request = self.http.post(api_url).json(&body);
        if let Some(api_key) = &self.options.api_key {
            request = request.bearer_auth(api_key);
        }
        for (name, value) in &self.options.extra_headers {
            request = request.header(name, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "reply endpoint request failed");
                return Delivery::Failed(send_failure_text(&error.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "reply endpoint returned non-success");
            return Delivery::Failed(send_failure_text(&format!("HTTP {}", status.as_u16())));
        }

        match response.json::<serde_json::Value>().await {
            Ok(value) => Delivery::Replied(reply_text(&value)),
            Err(error) => {
                warn!(error = %error, "reply endpoint body malformed");
                Delivery::Failed(send_failure_text(&error.to_string()))
            }
        }
    }

    /// Announce pre-chat metadata: over the channel when connected, else one
    /// fire-and-forget POST to the metadata endpoint. Failures are logged,
    /// never surfaced.
    pub async fn send_metadata(&self, user_id: &str, metadata: &PreChatMetadata) {
        if self.state == TransportState::Connected {
            let event = ClientEvent::SetMetadata {
                user_id: user_id.to_owned(),
                metadata: metadata.clone(),
            };
            if self.outbound.send(event).await.is_ok() {
                return;
            }
        }

        let url = format!(
            "{}/chats/{}/metadata",
            self.options.backend_url().trim_end_matches('/'),
            urlencoding::encode(user_id)
        );
        let request = self.http.post(url).json(metadata);
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = response.status().as_u16(), "metadata post returned non-success");
                }
                Err(error) => warn!(error = %error, "metadata post failed"),
                Ok(_) => {}
            }
        });
    }
}

/// Channel lifecycle driver. Feeds the single event stream the state
/// machine consumes.
async fn drive_channel(
    connector: Arc<dyn Connector>,
    params: ConnectParams,
    events: mpsc::Sender<ChannelEvent>,
    mut outbound_rx: mpsc::Receiver<ClientEvent>,
) {
    if let Err(error) = connector.load().await {
        warn!(error = %error, "channel library load failed");
        let _ = events.send(ChannelEvent::LoadFailed(error.to_string())).await;
        return;
    }
    let _ = events.send(ChannelEvent::Ready).await;

    loop {
        match connector.connect(&params).await {
            Ok(mut connection) => {
                let _ = events.send(ChannelEvent::Connected).await;
                loop {
                    tokio::select! {
                        inbound = connection.inbound.recv() => {
                            let Some(message) = inbound else { break };
                            let _ = events.send(ChannelEvent::Message(message)).await;
                        }
                        outgoing = outbound_rx.recv() => {
                            let Some(event) = outgoing else { return };
                            if connection.outbound.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = events.send(ChannelEvent::Disconnected).await;
            }
            Err(error) => {
                warn!(error = %error, "channel connect failed");
                let _ = events.send(ChannelEvent::Disconnected).await;
            }
        }

        if !connector.reconnects() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
        let _ = events.send(ChannelEvent::Connecting).await;
    }
}

/// Synthesize the local echo reply after a randomized short delay.
async fn deliver_echo(text: &str) -> Delivery {
    let delay_ms = rand::rng().random_range(ECHO_DELAY_MIN_MS..ECHO_DELAY_MAX_MS);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Delivery::Echoed(format!("Echo: {text}"))
}

/// Pull the reply text out of a reply-endpoint response body: first of the
/// recognized keys, else the whole body rendered as JSON.
fn reply_text(value: &serde_json::Value) -> String {
    ["reply", "message", "text"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map_or_else(|| value.to_string(), ToOwned::to_owned)
}

fn send_failure_text(detail: &str) -> String {
    format!("Sorry, something went wrong. {detail}")
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
