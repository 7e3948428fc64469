/// Wire shapes exchanged between extension contexts
use crate::api::SaveLinkRequest;
use crate::config::Config;
use crate::session::AuthState;
use crate::toast::ToastKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Runtime messages, tagged by their `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "SAVE_LINK")]
    SaveLink(SaveLinkRequest),
    #[serde(rename = "GET_CONFIG")]
    GetConfig,
    #[serde(rename = "CHECK_AUTH")]
    CheckAuth,
    #[serde(rename = "QUICKLINKS_SAVE_AUTH", alias = "CLIPGEST_SAVE_AUTH")]
    SaveAuth(SaveAuthPayload),
    #[serde(rename = "LOGOUT")]
    Logout,
    #[serde(rename = "QUICKLINKS_TOAST")]
    Toast(ToastMessage),
}

impl Message {
    /// Parse an incoming message. Unknown or malformed messages are `None`.
    pub fn from_value(value: Value) -> Option<Message> {
        serde_json::from_value(value).ok()
    }
}

/// Auth handed over from the web dashboard.
/// Non-string fields are treated as absent rather than rejecting the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAuthPayload {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToastMessage {
    pub message: String,
    #[serde(rename = "toastType", default)]
    pub toast_type: ToastKind,
}

impl ToastMessage {
    pub fn new(message: impl Into<String>, toast_type: ToastKind) -> Self {
        ToastMessage {
            message: message.into(),
            toast_type,
        }
    }
}

/// `{success, id?, error?}` reply for actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn ok() -> Self {
        Outcome {
            success: true,
            id: None,
            error: None,
        }
    }

    pub fn saved(id: String) -> Self {
        Outcome {
            id: Some(id),
            ..Outcome::ok()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Outcome {
            success: false,
            id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Exactly one of these answers each handled message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Config(Config),
    Auth(AuthState),
    Outcome(Outcome),
}

/// chrome.contextMenus.onClicked info, reduced to the fields used
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuClick {
    pub menu_item_id: Value,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub selection_text: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TabRef {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}
