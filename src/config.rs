//! Widget addressing and embed configuration.
//!
//! DESIGN
//! ======
//! Everything is resolved exactly once at construction into an immutable
//! `ResolvedConfig` that the other components borrow. Resolution never
//! fails: malformed URLs degrade to `None`/empty so the widget renders even
//! with no backend configured.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::{Origin, Url};

use crate::store::ChatMessage;

/// Filename of the distributed widget bundle, used to recognize the script
/// tag that loaded it among all scripts on the page.
pub const BUNDLE_NAME: &str = "script.js";

/// Backend origin used when the host configures nothing.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

/// Host-supplied transform producing the reply-endpoint request body from
/// the conversation history.
pub type PayloadFn = Arc<dyn Fn(&[ChatMessage]) -> serde_json::Value + Send + Sync>;

/// Embed configuration supplied by the host before activation.
///
/// Every field is optional; the widget works with all of them absent.
#[derive(Clone, Default)]
pub struct WidgetOptions {
    /// Explicit owner identifier; takes precedence over the `cid` query
    /// parameter on the loading script URL.
    pub owner_id: Option<String>,
    /// Explicit API origin for the settings endpoint.
    pub api_base: Option<String>,
    /// Request/response reply endpoint. When set, all sends go here.
    pub api_url: Option<String>,
    /// Bearer credential attached to reply-endpoint requests.
    pub api_key: Option<String>,
    /// Realtime channel / backend origin.
    pub socket_url: Option<String>,
    /// Extra headers merged into reply-endpoint requests.
    pub extra_headers: Vec<(String, String)>,
    /// Custom reply-endpoint body builder.
    pub payload: Option<PayloadFn>,
}

impl WidgetOptions {
    /// The backend origin for channel and metadata traffic.
    #[must_use]
    pub fn backend_url(&self) -> &str {
        self.socket_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }
}

impl fmt::Debug for WidgetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetOptions")
            .field("owner_id", &self.owner_id)
            .field("api_base", &self.api_base)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("socket_url", &self.socket_url)
            .field("extra_headers", &self.extra_headers)
            .field("payload", &self.payload.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The host page's script environment, as seen at injection time.
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    /// URL of the embedding page; base for relative script URLs.
    pub page_url: Option<String>,
    /// URL of the currently executing script tag, when known.
    pub current_script: Option<String>,
    /// URLs of every script tag on the page, in document order.
    pub scripts: Vec<String>,
}

/// Addressing resolved once at startup, immutable for the activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Identifier of the party owning this widget instance.
    pub owner_id: Option<String>,
    /// Origin of the settings API; empty means "same origin".
    pub api_origin: String,
}

/// Resolve owner identifier and API origin from explicit options and the
/// script environment. Synchronous and infallible.
#[must_use]
pub fn resolve(options: &WidgetOptions, context: &ScriptContext) -> ResolvedConfig {
    let owner_id = options
        .owner_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| owner_from_scripts(context));

    let api_origin = options
        .api_base
        .clone()
        .filter(|base| !base.is_empty())
        .or_else(|| {
            context
                .current_script
                .as_deref()
                .and_then(|script| origin_of(context, script))
        })
        .or_else(|| {
            context
                .scripts
                .iter()
                .find(|script| script.contains(BUNDLE_NAME))
                .and_then(|script| origin_of(context, script))
        })
        .unwrap_or_default();

    debug!(owner_id = ?owner_id, api_origin = %api_origin, "resolved widget addressing");
    ResolvedConfig { owner_id, api_origin }
}

/// Extract the `cid` query parameter from the first script URL that looks
/// like the widget bundle. The first match decides: a bundle script without
/// a `cid` parameter yields `None` even if a later script carries one.
fn owner_from_scripts(context: &ScriptContext) -> Option<String> {
    let candidate = context
        .scripts
        .iter()
        .find(|script| script.contains(BUNDLE_NAME) && script.contains('?'))?;
    let url = parse_script_url(context, candidate)?;
    url.query_pairs()
        .find(|(key, _)| key == "cid")
        .map(|(_, value)| value.into_owned())
}

/// The origin of a script URL, `None` for opaque or unparseable ones.
fn origin_of(context: &ScriptContext, raw: &str) -> Option<String> {
    let url = parse_script_url(context, raw)?;
    match url.origin() {
        origin @ Origin::Tuple(..) => Some(origin.ascii_serialization()),
        Origin::Opaque(_) => None,
    }
}

/// Parse a script URL, resolving relative ones against the page URL.
fn parse_script_url(context: &ScriptContext, raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(context.page_url.as_deref()?).ok()?;
            base.join(raw).ok()
        }
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
