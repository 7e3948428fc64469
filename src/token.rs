/// Compact token (JWT-shaped) payload decoding.
///
/// Only the middle segment is read. The signature is never checked here: the
/// backend verifies authenticity, the extension holds no key material.
use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use serde::Deserialize;
use serde_json::Value;

const URL_SAFE_ANY_PAD: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The claims the extension consumes. Everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub sub: Option<String>,
    /// Expiry in seconds since the epoch
    #[serde(default, deserialize_with = "finite_number")]
    pub exp: Option<f64>,
}

impl TokenClaims {
    /// Expiry converted to epoch milliseconds
    pub fn expires_at_ms(&self) -> Option<i64> {
        self.exp.filter(|exp| *exp > 0.0).map(|exp| (exp * 1000.0) as i64)
    }
}

/// True when the token has exactly three dot-separated segments
pub fn has_compact_shape(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Decode the payload segment into claims.
/// Returns `None` when the segment is missing, not base64url, or not a JSON object.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1).filter(|segment| !segment.is_empty())?;
    let bytes = URL_SAFE_ANY_PAD.decode(payload).ok()?;

    match serde_json::from_slice::<Value>(&bytes).ok()? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

fn finite_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()))
}
