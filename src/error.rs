//! Error type shared across the widget runtime.
//!
//! Almost every failure in this crate degrades rather than propagates: bad
//! addressing resolves to nulls, a failed settings fetch falls back to
//! defaults, a dead channel falls back to the echo path. `Error` covers the
//! few operations that do report failure to the embedding host and to the
//! transport driver.

/// Errors surfaced by the widget runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel URL does not use a scheme the connector can dial.
    #[error("invalid channel URL: {0}")]
    InvalidChannelUrl(String),

    /// The websocket connection or handshake failed.
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),

    /// The websocket connection was closed or refused.
    #[error("websocket closed")]
    WsClosed,

    /// A required pre-chat field was left empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `activate` was called more than once on the same widget.
    #[error("widget already activated")]
    AlreadyActivated,
}
