use super::*;

#[test]
fn message_event_serializes_with_owner() {
    let event = ClientEvent::Message { text: "hi".to_owned(), owner_id: Some("abc123".to_owned()) };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({ "event": "message", "data": { "text": "hi", "ownerId": "abc123" } })
    );
}

#[test]
fn message_event_omits_absent_owner() {
    let event = ClientEvent::Message { text: "hi".to_owned(), owner_id: None };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json, serde_json::json!({ "event": "message", "data": { "text": "hi" } }));
}

#[test]
fn set_metadata_flattens_the_metadata_fields() {
    let event = ClientEvent::SetMetadata {
        user_id: "u_abc1234".to_owned(),
        metadata: PreChatMetadata {
            name: Some("Ada".to_owned()),
            email: None,
            phone: None,
            owner_id: Some("abc123".to_owned()),
        },
    };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "event": "setMetadata",
            "data": { "userId": "u_abc1234", "username": "Ada", "ownerId": "abc123" }
        })
    );
}

#[test]
fn inbound_owner_message_parses() {
    let raw = r#"{ "event": "message", "data": { "from": "owner", "text": "hello" } }"#;
    let event: ServerEvent = serde_json::from_str(raw).expect("parse");
    assert_eq!(
        event,
        ServerEvent::Message(InboundMessage { from: Origin::Owner, text: "hello".to_owned() })
    );
}

#[test]
fn inbound_ai_message_parses() {
    let raw = r#"{ "event": "message", "data": { "from": "ai", "text": "42" } }"#;
    let ServerEvent::Message(message) = serde_json::from_str(raw).expect("parse");
    assert_eq!(message.from, Origin::Ai);
}

#[test]
fn unrecognized_sender_maps_to_unknown() {
    let raw = r#"{ "event": "message", "data": { "from": "system", "text": "x" } }"#;
    let ServerEvent::Message(message) = serde_json::from_str::<ServerEvent>(raw).expect("parse");
    assert_eq!(message.from, Origin::Unknown);
}

#[test]
fn malformed_events_fail_to_parse() {
    assert!(serde_json::from_str::<ServerEvent>(r#"{ "event": "message" }"#).is_err());
    assert!(serde_json::from_str::<ServerEvent>(r#"{ "event": "presence", "data": {} }"#).is_err());
    assert!(serde_json::from_str::<ServerEvent>("[]").is_err());
}

#[test]
fn client_events_round_trip() {
    let events = [
        ClientEvent::Message { text: "hi".to_owned(), owner_id: Some("o".to_owned()) },
        ClientEvent::SetMetadata { user_id: "u_x".to_owned(), metadata: PreChatMetadata::default() },
    ];
    for event in events {
        let json = serde_json::to_string(&event).expect("serialize");
        let restored: ClientEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, event);
    }
}
