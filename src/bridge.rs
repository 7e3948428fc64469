/// Page-to-extension auth hand-off.
///
/// The dashboard posts `{type: "QUICKLINKS_EXTENSION_AUTH", token, userId?, apiBaseUrl?}`
/// to its own window. Anything that is not exactly that, from that window and
/// origin, is dropped without a trace.
use crate::messages::{Message, SaveAuthPayload};
use serde_json::Value;

pub const AUTH_MARKER: &str = "QUICKLINKS_EXTENSION_AUTH";
pub const LEGACY_AUTH_MARKER: &str = "CLIPGEST_EXTENSION_AUTH";

/// The parts of a `message` event the bridge looks at
#[derive(Debug, Clone)]
pub struct BridgeEvent<'a> {
    /// `event.source === window`
    pub from_same_window: bool,
    pub origin: &'a str,
    pub page_origin: &'a str,
    pub data: &'a Value,
}

/// The message to forward to the background, or `None` to ignore the event
pub fn accept(event: &BridgeEvent<'_>) -> Option<Message> {
    if !event.from_same_window {
        return None;
    }

    let data = event.data.as_object()?;
    let marker = data.get("type").and_then(Value::as_str)?;
    if marker != AUTH_MARKER && marker != LEGACY_AUTH_MARKER {
        return None;
    }

    if event.origin != event.page_origin {
        return None;
    }

    let token = data
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())?;
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

    Some(Message::SaveAuth(SaveAuthPayload {
        token: Some(token.to_string()),
        user_id: text("userId"),
        api_base_url: text("apiBaseUrl"),
    }))
}
