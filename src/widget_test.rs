use std::sync::Arc;

use super::*;
use crate::channel::test_helpers::FakeConnector;
use crate::storage::{KEY_CONVERSATION, KEY_METADATA, MemoryStorage, Storage};
use crate::store::Role;
use crate::wire::{ClientEvent, InboundMessage};

fn widget_with(options: WidgetOptions) -> ChatWidget {
    ChatWidget::new(options, &ScriptContext::default(), StorageArea::in_memory())
}

fn owner_options() -> WidgetOptions {
    WidgetOptions { owner_id: Some("abc123".to_owned()), ..Default::default() }
}

async fn drain_until_connected(widget: &mut ChatWidget) {
    while let Some(event) = widget.next_event().await {
        if event == ChannelEvent::Connected {
            return;
        }
    }
    panic!("channel never connected");
}

async fn inject_and_handle(widget: &mut ChatWidget, wire: &crate::channel::test_helpers::FakeWire, message: InboundMessage) {
    wire.inject.send(message).await.expect("inject");
    loop {
        match widget.next_event().await.expect("event") {
            ChannelEvent::Message(_) => return,
            _ => {}
        }
    }
}

#[tokio::test]
async fn activation_seeds_the_greeting_once() {
    let mut widget = widget_with(WidgetOptions::default());
    widget.activate(Arc::new(FakeConnector::never_connects())).await.expect("activate");

    assert_eq!(widget.messages().len(), 1);
    assert_eq!(widget.messages()[0].text, DEFAULT_GREETING);
    assert_eq!(widget.view().unread, 0, "the greeting is not an unread backend message");
    assert!(widget.stylesheet().is_some());
}

#[tokio::test]
async fn restored_conversations_do_not_get_a_greeting() {
    let durable = MemoryStorage::new();
    let mut session = MemoryStorage::new();
    session.set(KEY_CONVERSATION, r#"[{ "role": "user", "text": "earlier", "ts": 1 }]"#);

    let storage = StorageArea::new(Box::new(durable), Box::new(session));
    let mut widget = ChatWidget::new(WidgetOptions::default(), &ScriptContext::default(), storage);
    widget.activate(Arc::new(FakeConnector::never_connects())).await.expect("activate");

    let texts: Vec<&str> = widget.messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["earlier"]);
}

#[tokio::test]
async fn second_activation_is_rejected() {
    let mut widget = widget_with(WidgetOptions::default());
    widget.activate(Arc::new(FakeConnector::never_connects())).await.expect("activate");

    let err = widget
        .activate(Arc::new(FakeConnector::never_connects()))
        .await
        .expect_err("second activation");
    assert!(matches!(err, Error::AlreadyActivated));
}

#[tokio::test]
async fn unread_counts_backend_messages_only_while_closed() {
    let (connector, wires) = FakeConnector::with_connections(1);
    let mut widget = widget_with(owner_options());
    widget.activate(Arc::new(connector)).await.expect("activate");
    drain_until_connected(&mut widget).await;
    let wire = &wires[0];

    for text in ["one", "two"] {
        inject_and_handle(
            &mut widget,
            wire,
            InboundMessage { from: Origin::Owner, text: text.to_owned() },
        )
        .await;
    }
    assert_eq!(widget.view().unread, 2);

    widget.open();
    assert_eq!(widget.view().unread, 0);

    inject_and_handle(
        &mut widget,
        wire,
        InboundMessage { from: Origin::Ai, text: "three".to_owned() },
    )
    .await;
    assert_eq!(widget.view().unread, 0, "messages while open are read immediately");
}

#[tokio::test]
async fn channel_send_leaves_one_indicator_until_the_reply() {
    let (connector, wires) = FakeConnector::with_connections(1);
    let mut widget = widget_with(owner_options());
    widget.activate(Arc::new(connector)).await.expect("activate");
    drain_until_connected(&mut widget).await;

    widget.send("anyone home?").await;
    assert!(widget.view().typing, "indicator stays up while awaiting the channel");

    widget.send("still there?").await;
    assert!(widget.view().typing, "at most one indicator, not one per send");

    inject_and_handle(
        &mut widget,
        &wires[0],
        InboundMessage { from: Origin::Owner, text: "here!".to_owned() },
    )
    .await;

    assert!(!widget.view().typing, "a matching inbound event clears the indicator");
    let last = widget.messages().last().expect("reply appended");
    assert_eq!(last.text, "here!");
    assert_eq!(last.role, Role::Bot);
}

#[tokio::test]
async fn unknown_origin_messages_are_dropped() {
    let (connector, wires) = FakeConnector::with_connections(1);
    let mut widget = widget_with(owner_options());
    widget.activate(Arc::new(connector)).await.expect("activate");
    drain_until_connected(&mut widget).await;
    let before = widget.messages().len();

    inject_and_handle(
        &mut widget,
        &wires[0],
        InboundMessage { from: Origin::Unknown, text: "spoofed".to_owned() },
    )
    .await;

    assert_eq!(widget.messages().len(), before);
    assert_eq!(widget.view().unread, 0);
}

#[tokio::test(start_paused = true)]
async fn offline_send_synthesizes_exactly_one_echo() {
    let mut widget = widget_with(WidgetOptions::default());
    widget.activate(Arc::new(FakeConnector::never_connects())).await.expect("activate");
    let before = widget.messages().len();

    widget.send("hello?").await;

    assert!(!widget.view().typing);
    assert_eq!(widget.messages().len(), before + 2, "the user message and one echo");
    assert_eq!(widget.messages().last().expect("echo").text, "Echo: hello?");
    assert_eq!(widget.view().unread, 0, "local echoes are not backend messages");
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let mut widget = widget_with(WidgetOptions::default());
    widget.send("   \n\t ").await;

    assert!(widget.messages().is_empty());
    assert!(!widget.view().typing);
}

#[tokio::test]
async fn gate_shows_until_metadata_is_submitted() {
    let mut widget = widget_with(owner_options());
    widget.open();
    assert!(widget.view().gate.visible);

    widget.submit_metadata(Some("Ada"), Some("ada@x.test"), None).await.expect("submit");
    assert!(!widget.view().gate.visible, "composer replaces the gate after submit");

    widget.close();
    widget.open();
    assert!(!widget.view().gate.visible, "persisted metadata keeps the gate away");
}

#[tokio::test]
async fn disabled_form_always_shows_the_composer() {
    let mut widget = widget_with(owner_options());
    widget.apply_settings(Some(Settings {
        show_pre_chat_form: Some(false),
        ..Default::default()
    }));

    widget.open();
    assert!(!widget.view().gate.visible);
}

#[tokio::test]
async fn required_gate_fields_are_enforced() {
    let mut widget = widget_with(owner_options());
    widget.apply_settings(Some(Settings {
        require_email_field: Some(true),
        ..Default::default()
    }));

    let err = widget.submit_metadata(Some("Ada"), None, None).await.expect_err("missing email");
    assert!(matches!(err, Error::MissingField("email")));
    assert!(widget.view().gate.visible, "a rejected submit leaves the gate up");

    widget.submit_metadata(Some("Ada"), Some("ada@x.test"), None).await.expect("submit");
    assert!(!widget.view().gate.visible);
}

#[tokio::test]
async fn settings_drive_header_and_gate_copy() {
    let mut widget = widget_with(owner_options());
    widget.apply_settings(Some(Settings {
        header_name: Some("Acme Support".to_owned()),
        header_message: Some("We reply fast".to_owned()),
        pre_chat_heading: Some("Let's talk".to_owned()),
        show_phone_field: Some(false),
        ..Default::default()
    }));

    let view = widget.view();
    assert_eq!(view.title, "Acme Support");
    assert_eq!(view.subtitle, "We reply fast");
    assert_eq!(view.gate.heading, "Let's talk");
    assert!(!view.gate.show_phone);
}

#[tokio::test]
async fn metadata_is_reannounced_on_connect() {
    let durable = MemoryStorage::new();
    {
        let mut seed = durable.clone();
        seed.set(KEY_METADATA, r#"{ "username": "Ada", "ownerId": "abc123" }"#);
    }
    let storage = StorageArea::new(Box::new(durable), Box::new(MemoryStorage::new()));

    let (connector, mut wires) = FakeConnector::with_connections(1);
    let mut widget = ChatWidget::new(owner_options(), &ScriptContext::default(), storage);
    widget.activate(Arc::new(connector)).await.expect("activate");
    drain_until_connected(&mut widget).await;

    let sent = wires[0].sent.recv().await.expect("announcement");
    let ClientEvent::SetMetadata { user_id, metadata } = sent else {
        panic!("expected a metadata announcement, got {sent:?}");
    };
    assert!(user_id.starts_with("u_"));
    assert_eq!(metadata.name.as_deref(), Some("Ada"));
    assert_eq!(metadata.owner_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn clear_empties_the_conversation() {
    let mut widget = widget_with(WidgetOptions::default());
    widget.activate(Arc::new(FakeConnector::never_connects())).await.expect("activate");
    assert!(!widget.messages().is_empty());

    widget.clear();
    assert!(widget.messages().is_empty());
}

#[tokio::test]
async fn status_reports_addressing_and_panel_state() {
    let mut widget = widget_with(owner_options());

    let status = widget.status();
    assert_eq!(status.owner_id.as_deref(), Some("abc123"));
    assert_eq!(status.api_origin, "");
    assert_eq!(status.connection, TransportState::Uninitialized);
    assert!(!status.open);

    widget.open();
    assert!(widget.status().open);
}
