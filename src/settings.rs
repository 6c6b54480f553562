//! Remote widget settings.
//!
//! One fetch per activation, no retries: a failure of any kind yields
//! `None` and the widget runs on built-in defaults for the rest of the
//! activation.

use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;

/// Path of the settings endpoint under the API origin.
pub const SETTINGS_PATH: &str = "/api/chatbotui";

/// Owner-configured appearance and behavior snapshot.
///
/// Every field is optional; absent fields fall back to built-in defaults at
/// the point of use. Unknown fields are ignored so the backend can grow the
/// payload without breaking deployed widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme_color_hex: Option<String>,
    pub theme_text_color_hex: Option<String>,
    pub bot_bubble_color: Option<String>,
    pub user_bubble_color: Option<String>,
    pub chat_bg_color: Option<String>,
    pub font_size: Option<String>,
    pub corner_radius: Option<String>,
    pub header_name: Option<String>,
    pub header_message: Option<String>,
    pub pre_chat_heading: Option<String>,
    pub bubble_text: Option<String>,
    pub show_pre_chat_form: Option<bool>,
    pub show_name_field: Option<bool>,
    pub require_name_field: Option<bool>,
    pub show_email_field: Option<bool>,
    pub require_email_field: Option<bool>,
    pub show_phone_field: Option<bool>,
    pub require_phone_field: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    success: bool,
    data: Option<EnvelopeData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopeData {
    settings: Option<Settings>,
}

/// Build the settings endpoint for an owner under an API origin.
///
/// An empty origin produces a relative path (same-origin embedding).
#[must_use]
pub fn settings_endpoint(api_origin: &str, owner_id: &str) -> String {
    format!(
        "{}{SETTINGS_PATH}?ownerId={}",
        api_origin.trim_end_matches('/'),
        urlencoding::encode(owner_id)
    )
}

/// Fetch the owner's settings, `None` on any failure.
///
/// No request is issued without an owner id. Called at most once per
/// activation; the outcome is final for that activation.
pub async fn fetch_settings(client: &reqwest::Client, config: &ResolvedConfig) -> Option<Settings> {
    let owner_id = config.owner_id.as_deref()?;
    let endpoint = settings_endpoint(&config.api_origin, owner_id);
    debug!(%endpoint, "fetching widget settings");

    let response = match client.get(&endpoint).header(CACHE_CONTROL, "no-store").send().await {
        Ok(response) => response,
        Err(error) => {
            warn!(error = %error, "settings fetch failed");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "settings fetch returned non-success");
        return None;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => {
            warn!(error = %error, "settings body read failed");
            return None;
        }
    };

    parse_settings_body(&body)
}

/// Parse the `{ success, data: { settings } }` envelope; anything else is
/// treated as "no settings".
#[must_use]
pub fn parse_settings_body(body: &str) -> Option<Settings> {
    let envelope = match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(error = %error, "settings body malformed");
            return None;
        }
    };

    if !envelope.success {
        return None;
    }
    envelope.data.and_then(|data| data.settings)
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
