/// Session state derived from the stored token
use crate::config::{ConfigStore, KeyValueStore};
use crate::error::LinkResult;
use crate::token::{decode_claims, has_compact_shape};
use serde::{Deserialize, Serialize};

/// Lifetime assumed for a token that carries no `exp` claim
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 60 * 60 * 1000;

/// Wall-clock source in epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Browser clock (`Date.now()`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub expires_at: Option<i64>,
}

impl AuthState {
    pub fn unauthenticated() -> Self {
        AuthState::default()
    }
}

pub struct SessionEvaluator<'a, S, C> {
    config: &'a ConfigStore<S>,
    clock: &'a C,
}

impl<'a, S: KeyValueStore, C: Clock> SessionEvaluator<'a, S, C> {
    pub fn new(config: &'a ConfigStore<S>, clock: &'a C) -> Self {
        SessionEvaluator { config, clock }
    }

    /// Recomputed from storage on every call. Corrupt or expired sessions are
    /// cleared as a side effect.
    pub async fn get_auth_state(&self) -> LinkResult<AuthState> {
        let config = self.config.get().await?;

        if config.clerk_token.is_empty() || config.clerk_user_id.is_empty() {
            log::debug!("No token or user id stored");
            return Ok(AuthState::unauthenticated());
        }

        if !has_compact_shape(&config.clerk_token) {
            log::warn!("Invalid token format, clearing auth");
            self.config.clear_auth().await?;
            return Ok(AuthState::unauthenticated());
        }

        let now = self.clock.now_ms();
        if config.clerk_token_expires_at != 0 && config.clerk_token_expires_at < now {
            log::info!(
                "Token expired {}ms ago, clearing auth",
                now - config.clerk_token_expires_at
            );
            self.config.clear_auth().await?;
            return Ok(AuthState::unauthenticated());
        }

        let Some(subject) = decode_claims(&config.clerk_token).and_then(|claims| claims.sub) else {
            log::warn!("Invalid token payload, clearing auth");
            self.config.clear_auth().await?;
            return Ok(AuthState::unauthenticated());
        };

        if subject != config.clerk_user_id {
            log::warn!(
                "Token subject {} differs from stored user id {}",
                subject,
                config.clerk_user_id
            );
        }

        Ok(AuthState {
            is_authenticated: true,
            user_id: Some(config.clerk_user_id),
            token: Some(config.clerk_token),
            expires_at: Some(config.clerk_token_expires_at).filter(|ms| *ms != 0),
        })
    }

    pub async fn is_authenticated(&self) -> LinkResult<bool> {
        Ok(self.get_auth_state().await?.is_authenticated)
    }

    pub async fn get_token(&self) -> LinkResult<Option<String>> {
        Ok(self.get_auth_state().await?.token)
    }
}
