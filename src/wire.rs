//! Wire events for the realtime channel.
//!
//! Events travel as JSON text frames shaped `{ "event": ..., "data": ... }`.
//! The inbound side only ever renders messages tagged as coming from the
//! backend operator or the automated agent; anything else is dropped at the
//! decode boundary.

use serde::{Deserialize, Serialize};

use crate::store::PreChatMetadata;

/// Events the widget emits to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// A visitor message, tagged with the owning party when known.
    Message {
        text: String,
        #[serde(rename = "ownerId", skip_serializing_if = "Option::is_none", default)]
        owner_id: Option<String>,
    },
    /// Pre-chat metadata announcement, keyed by the client identity.
    SetMetadata {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(flatten)]
        metadata: PreChatMetadata,
    },
}

/// Who produced an inbound channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The backend operator answering live.
    Owner,
    /// The automated agent.
    Ai,
    /// Anything else; never rendered.
    #[serde(other)]
    Unknown,
}

/// An inbound message event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: Origin,
    pub text: String,
}

/// Events the backend pushes to the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Message(InboundMessage),
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
