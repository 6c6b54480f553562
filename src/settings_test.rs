use super::*;

#[test]
fn endpoint_joins_origin_path_and_owner() {
    assert_eq!(
        settings_endpoint("https://x.test", "abc123"),
        "https://x.test/api/chatbotui?ownerId=abc123"
    );
}

#[test]
fn endpoint_trims_trailing_slash() {
    assert_eq!(
        settings_endpoint("https://x.test/", "abc123"),
        "https://x.test/api/chatbotui?ownerId=abc123"
    );
}

#[test]
fn endpoint_encodes_the_owner_id() {
    assert_eq!(
        settings_endpoint("https://x.test", "a b&c"),
        "https://x.test/api/chatbotui?ownerId=a%20b%26c"
    );
}

#[test]
fn endpoint_with_empty_origin_is_relative() {
    assert_eq!(settings_endpoint("", "abc123"), "/api/chatbotui?ownerId=abc123");
}

#[test]
fn successful_envelope_yields_settings() {
    let body = r#"{
        "success": true,
        "data": { "settings": { "headerName": "Support", "showPreChatForm": false } }
    }"#;

    let settings = parse_settings_body(body).expect("settings");
    assert_eq!(settings.header_name.as_deref(), Some("Support"));
    assert_eq!(settings.show_pre_chat_form, Some(false));
    assert_eq!(settings.theme_color_hex, None);
}

#[test]
fn unsuccessful_envelope_yields_none() {
    let body = r#"{ "success": false, "data": { "settings": { "headerName": "Support" } } }"#;
    assert_eq!(parse_settings_body(body), None);
}

#[test]
fn missing_data_yields_none() {
    assert_eq!(parse_settings_body(r#"{ "success": true }"#), None);
    assert_eq!(parse_settings_body(r#"{ "success": true, "data": {} }"#), None);
}

#[test]
fn malformed_body_yields_none() {
    assert_eq!(parse_settings_body("not json"), None);
    assert_eq!(parse_settings_body("[1, 2, 3]"), None);
}

#[test]
fn unknown_fields_are_ignored() {
    let body = r#"{
        "success": true,
        "data": { "settings": { "bubbleText": "Welcome!", "futureKnob": 7 } }
    }"#;

    let settings = parse_settings_body(body).expect("settings");
    assert_eq!(settings.bubble_text.as_deref(), Some("Welcome!"));
}

#[test]
fn absent_fields_default_to_none() {
    let body = r#"{ "success": true, "data": { "settings": {} } }"#;
    let settings = parse_settings_body(body).expect("settings");
    assert_eq!(settings, Settings::default());
}
