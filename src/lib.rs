//! Floating chat widget runtime.
//!
//! This crate models the client-side state machine of an embeddable chat
//! widget: addressing resolution, remote settings and theming, conversation
//! persistence, and dual-path message delivery over a realtime channel with
//! graceful degradation to request/response and finally to a local echo.
//!
//! The host surface (a page, a terminal, a test harness) supplies storage
//! backends and renders the widget's view-state; the runtime itself never
//! reaches outside its own state. See `ChatWidget` for the public control
//! surface: open, close, send, clear, and status.

pub mod channel;
pub mod config;
pub mod error;
pub mod settings;
pub mod storage;
pub mod store;
pub mod theme;
pub mod transport;
pub mod widget;
pub mod wire;

pub use channel::{ConnectParams, Connection, Connector, WsConnector};
pub use config::{ResolvedConfig, ScriptContext, WidgetOptions};
pub use error::Error;
pub use settings::Settings;
pub use storage::{JsonFileStorage, MemoryStorage, Storage, StorageArea};
pub use store::{ChatMessage, ConversationStore, PreChatMetadata, Role};
pub use theme::{StyleRegistry, StyleSheet};
pub use transport::{ChannelEvent, Delivery, Transport, TransportState};
pub use widget::{ChatWidget, GateView, WidgetStatus, WidgetView};
pub use wire::{ClientEvent, InboundMessage, Origin, ServerEvent};
