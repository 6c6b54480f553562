//! The widget: orchestration, view-state, and the public control surface.
//!
//! ARCHITECTURE
//! ============
//! `ChatWidget` wires the resolved configuration, the conversation store,
//! the theming engine, and the transport together, and owns the only
//! mutable view-state in the system. Hosts render `WidgetView` plus the
//! conversation and drive the five control operations (open, close, send,
//! clear, status); nothing here reaches outside the widget's own state.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::channel::{ConnectParams, Connector};
use crate::config::{self, ResolvedConfig, ScriptContext, WidgetOptions};
use crate::error::Error;
use crate::settings::{self, Settings};
use crate::storage::StorageArea;
use crate::store::{ChatMessage, ConversationStore, PreChatMetadata};
use crate::theme::{self, StyleRegistry, StyleSheet};
use crate::transport::{ChannelEvent, Delivery, Transport, TransportState};
use crate::wire::Origin;

/// Header title shown before settings arrive (and after a failed fetch).
pub const DEFAULT_TITLE: &str = "Assistant";

/// Header subtitle fallback.
pub const DEFAULT_SUBTITLE: &str = "Ask anything — powered by your app";

/// Pre-chat gate submit label fallback.
pub const DEFAULT_START_LABEL: &str = "Start Chat";

/// Greeting appended when the restored conversation is empty.
pub const DEFAULT_GREETING: &str = "Hi! I'm your assistant — ask me anything.";

/// Pre-chat gate presentation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateView {
    /// Whether the gate (rather than the composer) is showing.
    pub visible: bool,
    /// Submit button label.
    pub heading: String,
    pub show_name: bool,
    pub require_name: bool,
    pub show_email: bool,
    pub require_email: bool,
    pub show_phone: bool,
    pub require_phone: bool,
}

impl Default for GateView {
    fn default() -> Self {
        Self {
            visible: false,
            heading: DEFAULT_START_LABEL.to_owned(),
            show_name: true,
            require_name: false,
            show_email: true,
            require_email: false,
            show_phone: true,
            require_phone: false,
        }
    }
}

/// Everything a host needs to render besides the conversation itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub open: bool,
    pub unread: u32,
    pub title: String,
    pub subtitle: String,
    /// Whether the awaiting-response indicator is showing. At most one.
    pub typing: bool,
    pub gate: GateView,
}

impl Default for WidgetView {
    fn default() -> Self {
        Self {
            open: false,
            unread: 0,
            title: DEFAULT_TITLE.to_owned(),
            subtitle: DEFAULT_SUBTITLE.to_owned(),
            typing: false,
            gate: GateView::default(),
        }
    }
}

/// Snapshot answered by the status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetStatus {
    pub owner_id: Option<String>,
    pub api_origin: String,
    pub connection: TransportState,
    pub open: bool,
}

/// One floating chat widget instance.
pub struct ChatWidget {
    config: ResolvedConfig,
    store: ConversationStore,
    transport: Transport,
    styles: StyleRegistry,
    settings: Option<Settings>,
    view: WidgetView,
    activated: bool,
}

impl ChatWidget {
    /// Build a widget. Addressing is resolved here, once, and never again.
    #[must_use]
    pub fn new(options: WidgetOptions, context: &ScriptContext, storage: StorageArea) -> Self {
        let config = config::resolve(&options, context);
        let store = ConversationStore::new(storage);
        let transport = Transport::new(options, config.clone());
        Self {
            config,
            store,
            transport,
            styles: StyleRegistry::new(),
            settings: None,
            view: WidgetView::default(),
            activated: false,
        }
    }

    /// Activate the widget: fetch settings, install the stylesheet, seed
    /// the greeting, and start the realtime channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyActivated`] on a second call; everything
    /// else degrades internally.
    pub async fn activate(&mut self, connector: Arc<dyn Connector>) -> Result<(), Error> {
        if self.activated {
            return Err(Error::AlreadyActivated);
        }
        self.activated = true;

        let fetched = settings::fetch_settings(self.transport.http(), &self.config).await;
        self.apply_settings(fetched);

        if self.store.messages().is_empty() {
            let greeting = self
                .settings
                .as_ref()
                .and_then(|s| s.bubble_text.clone())
                .unwrap_or_else(|| DEFAULT_GREETING.to_owned());
            self.store.append(ChatMessage::bot(greeting));
        }

        let user_id = self.store.client_identity();
        let params = ConnectParams { user_id, owner_id: self.config.owner_id.clone() };
        self.transport.activate(connector, params);
        Ok(())
    }

    /// Apply a settings snapshot (or its absence) to theme and view-state.
    pub(crate) fn apply_settings(&mut self, fetched: Option<Settings>) {
        self.styles.install(theme::build_stylesheet(fetched.as_ref()));

        if let Some(s) = &fetched {
            if let Some(title) = &s.header_name {
                self.view.title = title.clone();
            }
            if let Some(subtitle) = &s.header_message {
                self.view.subtitle = subtitle.clone();
            }
            if let Some(heading) = &s.pre_chat_heading {
                self.view.gate.heading = heading.clone();
            }
            if let Some(v) = s.show_name_field {
                self.view.gate.show_name = v;
            }
            if let Some(v) = s.require_name_field {
                self.view.gate.require_name = v;
            }
            if let Some(v) = s.show_email_field {
                self.view.gate.show_email = v;
            }
            if let Some(v) = s.require_email_field {
                self.view.gate.require_email = v;
            }
            if let Some(v) = s.show_phone_field {
                self.view.gate.show_phone = v;
            }
            if let Some(v) = s.require_phone_field {
                self.view.gate.require_phone = v;
            }
        }

        self.settings = fetched;
        self.refresh_gate();
    }

    /// Open the panel: clears the unread badge and re-evaluates the gate.
    pub fn open(&mut self) {
        self.view.open = true;
        self.view.unread = 0;
        self.refresh_gate();
    }

    /// Close the panel.
    pub fn close(&mut self) {
        self.view.open = false;
    }

    /// Toggle the panel.
    pub fn toggle(&mut self) {
        if self.view.open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Send a visitor message through the send policy. Blank input is a
    /// no-op.
    pub async fn send(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        self.store.append(ChatMessage::user(trimmed));
        self.view.typing = true;

        let delivery = self.transport.deliver(trimmed, self.store.messages()).await;
        match delivery {
            Delivery::Replied(reply) => {
                self.view.typing = false;
                self.append_backend_reply(reply);
            }
            Delivery::Echoed(reply) => {
                self.view.typing = false;
                self.store.append(ChatMessage::bot(reply));
            }
            Delivery::Failed(message) => {
                self.view.typing = false;
                self.store.append(ChatMessage::bot(message));
            }
            // Indicator stays up until a matching inbound event arrives.
            Delivery::AwaitingChannel => {}
        }
    }

    /// Submit the pre-chat gate: persist metadata, announce it, and swap
    /// the gate for the composer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] when a field the settings mark
    /// required is empty.
    pub async fn submit_metadata(
        &mut self,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), Error> {
        let normalize =
            |value: Option<&str>| value.map(str::trim).filter(|v| !v.is_empty()).map(ToOwned::to_owned);
        let metadata = PreChatMetadata {
            name: normalize(name),
            email: normalize(email),
            phone: normalize(phone),
            owner_id: self.config.owner_id.clone(),
        };

        if self.view.gate.require_name && metadata.name.is_none() {
            return Err(Error::MissingField("name"));
        }
        if self.view.gate.require_email && metadata.email.is_none() {
            return Err(Error::MissingField("email"));
        }
        if self.view.gate.require_phone && metadata.phone.is_none() {
            return Err(Error::MissingField("phone"));
        }

        self.store.save_metadata(&metadata);
        let user_id = self.store.client_identity();
        self.transport.send_metadata(&user_id, &metadata).await;
        self.refresh_gate();
        Ok(())
    }

    /// Empty the conversation and its persisted form.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Answer the host's status query.
    #[must_use]
    pub fn status(&self) -> WidgetStatus {
        WidgetStatus {
            owner_id: self.config.owner_id.clone(),
            api_origin: self.config.api_origin.clone(),
            connection: self.transport.state(),
            open: self.view.open,
        }
    }

    /// The conversation, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    /// The render state.
    #[must_use]
    pub fn view(&self) -> &WidgetView {
        &self.view
    }

    /// The installed stylesheet, once activated.
    #[must_use]
    pub fn stylesheet(&self) -> Option<&StyleSheet> {
        self.styles.current()
    }

    /// Wait for the next channel event and apply its UI side effects.
    ///
    /// `None` once the channel driver has shut down for good.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let event = self.transport.next_event().await?;
        self.handle_event(&event).await;
        Some(event)
    }

    /// Apply one channel event to the widget state.
    pub(crate) async fn handle_event(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                // Re-announce the visitor on every (re)connect.
                if let Some(metadata) = self.store.metadata() {
                    let user_id = self.store.client_identity();
                    self.transport.send_metadata(&user_id, &metadata).await;
                }
            }
            ChannelEvent::Message(message) => match message.from {
                Origin::Owner | Origin::Ai => {
                    self.view.typing = false;
                    self.append_backend_reply(message.text.clone());
                }
                Origin::Unknown => {
                    debug!("ignoring channel message from unrecognized origin");
                }
            },
            ChannelEvent::LoadFailed(reason) => {
                warn!(%reason, "realtime channel unavailable for this activation");
            }
            ChannelEvent::Ready | ChannelEvent::Connecting | ChannelEvent::Disconnected => {}
        }
    }

    /// Append a backend-originated reply, counting it as unread while the
    /// panel is closed.
    fn append_backend_reply(&mut self, text: String) {
        self.store.append(ChatMessage::bot(text));
        if !self.view.open {
            self.view.unread += 1;
        }
    }

    /// The gate shows iff the form is enabled and no metadata exists yet.
    fn refresh_gate(&mut self) {
        let form_enabled =
            self.settings.as_ref().and_then(|s| s.show_pre_chat_form).unwrap_or(true);
        self.view.gate.visible = form_enabled && self.store.metadata().is_none();
    }
}

#[cfg(test)]
#[path = "widget_test.rs"]
mod tests;
