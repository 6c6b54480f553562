//! Realtime channel capability interface and the websocket connector.
//!
//! DESIGN
//! ======
//! The transport state machine never touches a socket directly: it talks to
//! a `Connector` that splits setup into two phases, resolving the channel
//! client and then dialing. A connection is a pair of mpsc halves, so tests
//! can drive the state machine with a fake connector and scripted traffic.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use crate::error::Error;
use crate::wire::{ClientEvent, InboundMessage, ServerEvent};

/// Identity carried on the channel handshake query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub user_id: String,
    pub owner_id: Option<String>,
}

/// One live channel connection: a sender for outbound events and a receiver
/// of inbound messages. The inbound side closing signals a disconnect.
pub struct Connection {
    pub outbound: mpsc::Sender<ClientEvent>,
    pub inbound: mpsc::Receiver<InboundMessage>,
}

/// Capability interface over the realtime channel.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Resolve the underlying channel implementation. Failure here is
    /// terminal for the activation; the transport never retries the load.
    async fn load(&self) -> Result<(), Error>;

    /// Dial one connection.
    async fn connect(&self, params: &ConnectParams) -> Result<Connection, Error>;

    /// Whether the channel re-dials after a disconnect.
    fn reconnects(&self) -> bool {
        true
    }
}

/// Websocket-backed connector.
pub struct WsConnector {
    socket_url: String,
}

impl WsConnector {
    #[must_use]
    pub fn new(socket_url: impl Into<String>) -> Self {
        Self { socket_url: socket_url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn load(&self) -> Result<(), Error> {
        // The native analog of fetching the channel client library: make
        // sure the configured URL is one we can dial at all.
        channel_url(&self.socket_url, &ConnectParams { user_id: String::new(), owner_id: None })
            .map(|_| ())
    }

    async fn connect(&self, params: &ConnectParams) -> Result<Connection, Error> {
        let url = channel_url(&self.socket_url, params)?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|error| Error::WsConnect(Box::new(error)))?;
        let (mut sink, mut source) = stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<ClientEvent>(64);
        let (in_tx, in_rx) = mpsc::channel::<InboundMessage>(64);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = out_rx.recv() => {
                        let Some(event) = outbound else { break };
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    inbound = source.next() => {
                        let Some(Ok(message)) = inbound else { break };
                        match message {
                            Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(ServerEvent::Message(inbound)) => {
                                    if in_tx.send(inbound).await.is_err() {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    warn!(error = %error, "unrecognized channel payload");
                                }
                            },
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                }
            }
            // Dropping in_tx closes the inbound half; the transport driver
            // observes the disconnect.
        });

        Ok(Connection { outbound: out_tx, inbound: in_rx })
    }
}

/// Convert a backend origin into the channel URL with identity query.
fn channel_url(socket_url: &str, params: &ConnectParams) -> Result<String, Error> {
    let trimmed = socket_url.trim_end_matches('/');
    let base = if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_owned()
    } else {
        return Err(Error::InvalidChannelUrl(socket_url.to_owned()));
    };

    let mut url = format!("{base}/?role=user&userId={}", urlencoding::encode(&params.user_id));
    if let Some(owner_id) = &params.owner_id {
        url.push_str("&ownerId=");
        url.push_str(&urlencoding::encode(owner_id));
    }
    Ok(url)
}
