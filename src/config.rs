/// Persisted extension settings backed by chrome.storage.sync
use crate::error::LinkResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_API_BASE_URL: &str = "https://quicklinks-hftb.onrender.com";

pub const KEY_API_BASE_URL: &str = "apiBaseUrl";
pub const KEY_CLERK_FRONTEND_API_URL: &str = "clerkFrontendApiUrl";
pub const KEY_CLERK_TOKEN: &str = "clerkToken";
pub const KEY_CLERK_USER_ID: &str = "clerkUserId";
pub const KEY_CLERK_TOKEN_EXPIRES_AT: &str = "clerkTokenExpiresAt";

pub const CONFIG_KEYS: [&str; 5] = [
    KEY_API_BASE_URL,
    KEY_CLERK_FRONTEND_API_URL,
    KEY_CLERK_TOKEN,
    KEY_CLERK_USER_ID,
    KEY_CLERK_TOKEN_EXPIRES_AT,
];

/// The three keys that make up a session. Always removed together.
pub const AUTH_KEYS: [&str; 3] = [KEY_CLERK_TOKEN, KEY_CLERK_USER_ID, KEY_CLERK_TOKEN_EXPIRES_AT];

/// Platform key-value storage. Every call goes to the backing store.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, keys: &[&str]) -> LinkResult<Map<String, Value>>;
    async fn set(&self, values: Map<String, Value>) -> LinkResult<()>;
    async fn remove(&self, keys: &[&str]) -> LinkResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub api_base_url: String,
    pub clerk_frontend_api_url: String,
    pub clerk_token: String,
    pub clerk_user_id: String,
    /// Epoch milliseconds, 0 when unset
    pub clerk_token_expires_at: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            clerk_frontend_api_url: String::new(),
            clerk_token: String::new(),
            clerk_user_id: String::new(),
            clerk_token_expires_at: 0,
        }
    }
}

impl Config {
    /// Merge stored values over the defaults. Empty strings, zero and values of
    /// the wrong type all fall back to the default.
    pub fn from_stored(stored: &Map<String, Value>) -> Config {
        let defaults = Config::default();
        let text = |key: &str, default: String| {
            stored
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or(default)
        };

        Config {
            api_base_url: text(KEY_API_BASE_URL, defaults.api_base_url),
            clerk_frontend_api_url: text(KEY_CLERK_FRONTEND_API_URL, defaults.clerk_frontend_api_url),
            clerk_token: text(KEY_CLERK_TOKEN, defaults.clerk_token),
            clerk_user_id: text(KEY_CLERK_USER_ID, defaults.clerk_user_id),
            clerk_token_expires_at: stored
                .get(KEY_CLERK_TOKEN_EXPIRES_AT)
                .and_then(Value::as_f64)
                .map(|ms| ms as i64)
                .filter(|ms| *ms != 0)
                .unwrap_or(defaults.clerk_token_expires_at),
        }
    }
}

/// Partial config; only the `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_frontend_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_token_expires_at: Option<i64>,
}

impl ConfigUpdate {
    fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

pub struct ConfigStore<S> {
    store: S,
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub fn new(store: S) -> Self {
        ConfigStore { store }
    }

    pub async fn get(&self) -> LinkResult<Config> {
        let stored = self.store.get(&CONFIG_KEYS).await?;
        Ok(Config::from_stored(&stored))
    }

    pub async fn set(&self, update: ConfigUpdate) -> LinkResult<()> {
        let values = update.into_map();
        if values.is_empty() {
            return Ok(());
        }
        self.store.set(values).await
    }

    pub async fn clear_auth(&self) -> LinkResult<()> {
        log::debug!("Clearing stored auth data");
        self.store.remove(&AUTH_KEYS).await
    }

    /// Settings form save. A blank API URL goes back to the default.
    pub async fn save_settings(&self, api_base_url: &str, clerk_frontend_api_url: &str) -> LinkResult<()> {
        let api_base_url = match api_base_url.trim() {
            "" => DEFAULT_API_BASE_URL.to_string(),
            url => url.to_string(),
        };

        self.set(ConfigUpdate {
            api_base_url: Some(api_base_url),
            clerk_frontend_api_url: Some(clerk_frontend_api_url.trim().to_string()),
            ..ConfigUpdate::default()
        })
        .await
    }
}
