/// Background message dispatch
use crate::api::{ApiClient, HttpTransport, SaveLinkRequest};
use crate::config::{ConfigStore, ConfigUpdate, KeyValueStore};
use crate::error::{LinkError, LinkResult};
use crate::messages::{ContextMenuClick, Message, Outcome, Reply, SaveAuthPayload, TabRef, ToastMessage};
use crate::session::{Clock, DEFAULT_TOKEN_LIFETIME_MS, SessionEvaluator};
use crate::toast::ToastKind;
use crate::token::decode_claims;

pub const CONTEXT_MENU_ID: &str = "quicklinks-save-link";
pub const CONTEXT_MENU_TITLE: &str = "Save link to QuickLinks";

pub struct MessageRouter<S, C, H> {
    config: ConfigStore<S>,
    clock: C,
    transport: H,
}

impl<S: KeyValueStore, C: Clock, H: HttpTransport> MessageRouter<S, C, H> {
    pub fn new(store: S, clock: C, transport: H) -> Self {
        MessageRouter {
            config: ConfigStore::new(store),
            clock,
            transport,
        }
    }

    fn session(&self) -> SessionEvaluator<'_, S, C> {
        SessionEvaluator::new(&self.config, &self.clock)
    }

    fn api(&self) -> ApiClient<'_, S, C, H> {
        ApiClient::new(&self.config, &self.clock, &self.transport)
    }

    /// Whether `route` will produce a reply for this message. Checked before the
    /// work starts so the runtime keeps the response channel open.
    pub fn answers(message: &Message) -> bool {
        !matches!(message, Message::Toast(_))
    }

    /// Handle one message. `None` means the message is not ours to answer.
    /// Failures never escape: they become an error-shaped reply.
    pub async fn route(&self, message: Message) -> Option<Reply> {
        let reply = match message {
            Message::SaveLink(request) => Reply::Outcome(self.save_link(request).await),
            Message::GetConfig => match self.config.get().await {
                Ok(config) => Reply::Config(config),
                Err(e) => Reply::Outcome(Outcome::failed(e)),
            },
            Message::CheckAuth => match self.session().get_auth_state().await {
                Ok(state) => Reply::Auth(state),
                Err(e) => Reply::Outcome(Outcome::failed(e)),
            },
            Message::SaveAuth(payload) => Reply::Outcome(match self.save_auth(payload).await {
                Ok(()) => Outcome::ok(),
                Err(e) => {
                    log::error!("Failed to save auth from web: {}", e);
                    Outcome::failed(e)
                }
            }),
            Message::Logout => Reply::Outcome(match self.config.clear_auth().await {
                Ok(()) => Outcome::ok(),
                Err(e) => Outcome::failed(e),
            }),
            Message::Toast(_) => return None,
        };
        Some(reply)
    }

    async fn save_link(&self, request: SaveLinkRequest) -> Outcome {
        match self.try_save_link(&request).await {
            Ok(id) => Outcome::saved(id),
            Err(e) => Outcome::failed(e),
        }
    }

    async fn try_save_link(&self, request: &SaveLinkRequest) -> LinkResult<String> {
        if !self.session().is_authenticated().await? {
            return Err(LinkError::Unauthenticated);
        }
        Ok(self.api().save_link(request).await?.id)
    }

    async fn save_auth(&self, payload: SaveAuthPayload) -> LinkResult<()> {
        let token = payload
            .token
            .filter(|token| !token.is_empty())
            .ok_or(LinkError::MissingToken)?;

        let claims = decode_claims(&token).ok_or(LinkError::InvalidToken)?;
        let user_id = payload
            .user_id
            .filter(|id| !id.is_empty())
            .or_else(|| claims.sub.clone())
            .ok_or(LinkError::InvalidToken)?;

        let now = self.clock.now_ms();
        let expires_at = claims
            .expires_at_ms()
            .unwrap_or(now + DEFAULT_TOKEN_LIFETIME_MS);

        log::info!(
            "Saving auth from web for {} (expires in {}ms)",
            user_id,
            expires_at - now
        );

        let api_base_url = payload.api_base_url.as_deref().and_then(|candidate| {
            let normalized = normalize_api_base_url(candidate);
            if normalized.is_none() {
                log::warn!("Ignoring API base URL without http(s) scheme: {}", candidate);
            }
            normalized
        });

        self.config
            .set(ConfigUpdate {
                api_base_url,
                clerk_token: Some(token),
                clerk_user_id: Some(user_id),
                clerk_token_expires_at: Some(expires_at),
                ..ConfigUpdate::default()
            })
            .await
    }

    /// Save from the link context menu. Returns the toast to push to the tab, if any.
    pub async fn context_menu_clicked(&self, click: ContextMenuClick, tab: Option<TabRef>) -> Option<ToastMessage> {
        if click.menu_item_id.as_str() != Some(CONTEXT_MENU_ID) {
            return None;
        }

        let Some(link_url) = click.link_url.filter(|url| !url.is_empty()) else {
            log::error!("No link URL found");
            return None;
        };

        match self.session().is_authenticated().await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("Context menu clicked but not authenticated");
                return Some(ToastMessage::new(
                    "Please log in first from the extension options",
                    ToastKind::Error,
                ));
            }
            Err(e) => return Some(ToastMessage::new(e.to_string(), ToastKind::Error)),
        }

        let page = tab
            .and_then(|tab| tab.url)
            .filter(|url| !url.is_empty())
            .or(click.page_url)
            .unwrap_or_default();
        let title = click
            .selection_text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| link_hostname(&link_url));

        let request = SaveLinkRequest {
            url: link_url,
            title,
            page,
            note: None,
            tags: None,
        };

        match self.api().save_link(&request).await {
            Ok(_) => Some(ToastMessage::new("Link saved!", ToastKind::Success)),
            Err(e) => {
                log::error!("Error while saving from context menu: {}", e);
                Some(ToastMessage::new(e.to_string(), ToastKind::Error))
            }
        }
    }
}

/// Accept only http(s) URLs; strip trailing slashes
pub fn normalize_api_base_url(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.trim_end_matches('/').to_string())
    } else {
        None
    }
}

fn link_hostname(link_url: &str) -> String {
    url::Url::parse(link_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| link_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, MemoryStore, RecordingTransport, make_token};
    use futures::executor::block_on;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn router(store: &MemoryStore, transport: &RecordingTransport) -> MessageRouter<MemoryStore, FixedClock, RecordingTransport> {
        MessageRouter::new(store.clone(), FixedClock::new(NOW), transport.clone())
    }

    fn signed_in_store() -> MemoryStore {
        MemoryStore::with(json!({
            "apiBaseUrl": "http://x.test",
            "clerkToken": make_token(json!({"sub": "user_1"})),
            "clerkUserId": "user_1",
            "clerkTokenExpiresAt": NOW + 60_000,
        }))
    }

    fn save_auth(store: &MemoryStore, payload: serde_json::Value) -> Option<Reply> {
        let mut message = json!({"type": "QUICKLINKS_SAVE_AUTH"});
        if let (Some(target), serde_json::Value::Object(fields)) = (message.as_object_mut(), payload) {
            target.extend(fields);
        }
        let message = Message::from_value(message).unwrap();
        block_on(router(store, &RecordingTransport::new()).route(message))
    }

    fn link_message() -> Message {
        Message::from_value(json!({
            "type": "SAVE_LINK",
            "url": "https://doc.rust-lang.org/book/",
            "title": "The Book",
            "page": "https://www.rust-lang.org",
            "note": "chapter 10",
        }))
        .unwrap()
    }

    #[test]
    fn test_save_auth_round_trip() {
        let store = MemoryStore::new();
        let token = make_token(json!({"sub": "u1", "exp": 1_700_003_600}));

        let reply = save_auth(&store, json!({"token": token}));
        assert_eq!(reply, Some(Reply::Outcome(Outcome::ok())));

        let state = block_on(router(&store, &RecordingTransport::new()).route(Message::CheckAuth));
        match state {
            Some(Reply::Auth(state)) => {
                assert!(state.is_authenticated);
                assert_eq!(state.user_id.as_deref(), Some("u1"));
                assert_eq!(state.expires_at, Some(1_700_003_600_000));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_save_auth_prefers_explicit_user_id() {
        let store = MemoryStore::new();
        let token = make_token(json!({"sub": "from_token"}));

        save_auth(&store, json!({"token": token, "userId": "explicit"}));

        assert_eq!(store.snapshot()["clerkUserId"], "explicit");
    }

    #[test]
    fn test_save_auth_defaults_expiry_to_one_hour() {
        let store = MemoryStore::new();

        save_auth(&store, json!({"token": make_token(json!({"sub": "u1"}))}));

        assert_eq!(store.snapshot()["clerkTokenExpiresAt"], NOW + DEFAULT_TOKEN_LIFETIME_MS);
    }

    #[test]
    fn test_save_auth_normalizes_api_base_url() {
        let store = MemoryStore::with(json!({"apiBaseUrl": "https://old.test"}));

        save_auth(&store, json!({"token": make_token(json!({"sub": "u1"})), "apiBaseUrl": " http://x.test// "}));

        assert_eq!(store.snapshot()["apiBaseUrl"], "http://x.test");
    }

    #[test]
    fn test_save_auth_rejects_non_http_api_base_url() {
        let store = MemoryStore::with(json!({"apiBaseUrl": "https://old.test"}));

        let reply = save_auth(&store, json!({"token": make_token(json!({"sub": "u1"})), "apiBaseUrl": "ftp://x.test"}));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::ok())));
        assert_eq!(store.snapshot()["apiBaseUrl"], "https://old.test");
    }

    #[test]
    fn test_save_auth_missing_token() {
        let store = MemoryStore::new();

        let reply = save_auth(&store, json!({"userId": "u1"}));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::failed("Missing token"))));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_save_auth_invalid_token() {
        let store = MemoryStore::new();

        let undecodable = save_auth(&store, json!({"token": "not-a-token", "userId": "u1"}));
        let no_subject = save_auth(&store, json!({"token": make_token(json!({"exp": 1}))}));

        assert_eq!(undecodable, Some(Reply::Outcome(Outcome::failed("Invalid token"))));
        assert_eq!(no_subject, Some(Reply::Outcome(Outcome::failed("Invalid token"))));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_save_link_success() {
        let store = signed_in_store();
        let transport = RecordingTransport::new().respond(200, "OK", r#"{"id":"link_42"}"#);

        let reply = block_on(router(&store, &transport).route(link_message()));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::saved("link_42".to_string()))));
        assert_eq!(transport.requests()[0].body["note"], "chapter 10");
    }

    #[test]
    fn test_save_link_unauthenticated_is_error_reply() {
        let transport = RecordingTransport::new();

        let reply = block_on(router(&MemoryStore::new(), &transport).route(link_message()));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::failed(LinkError::Unauthenticated))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_save_link_api_failure_is_error_reply() {
        let transport = RecordingTransport::new().respond(401, "Unauthorized", "");

        let reply = block_on(router(&signed_in_store(), &transport).route(link_message()));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::failed(LinkError::SessionExpired))));
    }

    #[test]
    fn test_save_link_with_partial_fields_still_gets_a_reply() {
        for message in [
            json!({"type": "SAVE_LINK", "url": "https://x.test"}),
            json!({"type": "SAVE_LINK", "url": "https://x.test", "title": null, "page": 7}),
        ] {
            let message = Message::from_value(message).unwrap();
            assert!(MessageRouter::<MemoryStore, FixedClock, RecordingTransport>::answers(&message));

            let reply = block_on(router(&MemoryStore::new(), &RecordingTransport::new()).route(message));

            assert_eq!(reply, Some(Reply::Outcome(Outcome::failed(LinkError::Unauthenticated))));
        }
    }

    #[test]
    fn test_save_link_with_partial_fields_posts_empty_strings() {
        let transport = RecordingTransport::new().respond(200, "OK", r#"{"id":"link_7"}"#);
        let message = Message::from_value(json!({"type": "SAVE_LINK", "url": "https://x.test"})).unwrap();

        let reply = block_on(router(&signed_in_store(), &transport).route(message));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::saved("link_7".to_string()))));
        assert_eq!(transport.requests()[0].body["title"], "");
        assert_eq!(transport.requests()[0].body["page"], "");
    }

    #[test]
    fn test_get_config_returns_config() {
        let store = signed_in_store();

        let reply = block_on(router(&store, &RecordingTransport::new()).route(Message::GetConfig));

        match reply {
            Some(Reply::Config(config)) => assert_eq!(config.api_base_url, "http://x.test"),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_logout_clears_auth() {
        let store = signed_in_store();

        let reply = block_on(router(&store, &RecordingTransport::new()).route(Message::Logout));

        assert_eq!(reply, Some(Reply::Outcome(Outcome::ok())));
        assert!(!store.snapshot().contains_key("clerkToken"));
        assert_eq!(store.snapshot()["apiBaseUrl"], "http://x.test");
    }

    #[test]
    fn test_toast_message_is_not_answered() {
        let message = Message::Toast(ToastMessage::new("hi", ToastKind::Info));

        assert!(!MessageRouter::<MemoryStore, FixedClock, RecordingTransport>::answers(&message));
        assert!(MessageRouter::<MemoryStore, FixedClock, RecordingTransport>::answers(&Message::CheckAuth));
        assert_eq!(block_on(router(&MemoryStore::new(), &RecordingTransport::new()).route(message)), None);
    }

    #[test]
    fn test_context_menu_save_uses_hostname_title() {
        let transport = RecordingTransport::new().respond(200, "OK", r#"{"id":"l1"}"#);
        let click = ContextMenuClick {
            menu_item_id: json!(CONTEXT_MENU_ID),
            link_url: Some("https://crates.io/crates/serde".to_string()),
            selection_text: None,
            page_url: Some("https://fallback.test".to_string()),
        };
        let tab = TabRef {
            id: Some(7),
            url: Some("https://reddit.com/r/rust".to_string()),
        };

        let toast = block_on(router(&signed_in_store(), &transport).context_menu_clicked(click, Some(tab)));

        assert_eq!(toast, Some(ToastMessage::new("Link saved!", ToastKind::Success)));
        let body = &transport.requests()[0].body;
        assert_eq!(body["title"], "crates.io");
        assert_eq!(body["page"], "https://reddit.com/r/rust");
    }

    #[test]
    fn test_context_menu_requires_login() {
        let transport = RecordingTransport::new();
        let click = ContextMenuClick {
            menu_item_id: json!(CONTEXT_MENU_ID),
            link_url: Some("https://crates.io".to_string()),
            ..ContextMenuClick::default()
        };

        let toast = block_on(router(&MemoryStore::new(), &transport).context_menu_clicked(click, None));

        assert_eq!(toast.map(|t| t.toast_type), Some(ToastKind::Error));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_context_menu_ignores_other_items() {
        let click = ContextMenuClick {
            menu_item_id: json!("something-else"),
            link_url: Some("https://crates.io".to_string()),
            ..ContextMenuClick::default()
        };

        let toast = block_on(router(&signed_in_store(), &RecordingTransport::new()).context_menu_clicked(click, None));

        assert_eq!(toast, None);
    }

    #[test]
    fn test_normalize_api_base_url() {
        assert_eq!(normalize_api_base_url("http://x.test/"), Some("http://x.test".to_string()));
        assert_eq!(normalize_api_base_url("https://x.test/api///"), Some("https://x.test/api".to_string()));
        assert_eq!(normalize_api_base_url("ftp://x.test"), None);
        assert_eq!(normalize_api_base_url("x.test"), None);
    }
}
