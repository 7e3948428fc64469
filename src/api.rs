/// Client for the QuickLinks backend
use crate::config::{ConfigStore, KeyValueStore};
use crate::error::{LinkError, LinkResult};
use crate::session::{Clock, SessionEvaluator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const ERROR_BODY_PREVIEW: usize = 300;

/// Missing or non-string `url`/`title`/`page` read as empty so the request
/// still reaches `save_link` and gets an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveLinkRequest {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveLinkResponse {
    pub id: String,
}

/// Structured error body returned by the API on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, connection, CORS)
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError(pub String);

/// Single JSON POST with a bearer token. Implementations must not retry.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn post_json(&self, url: &str, bearer: &str, body: String) -> Result<HttpResponse, TransportError>;
}

pub struct ApiClient<'a, S, C, H> {
    config: &'a ConfigStore<S>,
    clock: &'a C,
    transport: &'a H,
}

impl<'a, S: KeyValueStore, C: Clock, H: HttpTransport> ApiClient<'a, S, C, H> {
    pub fn new(config: &'a ConfigStore<S>, clock: &'a C, transport: &'a H) -> Self {
        ApiClient { config, clock, transport }
    }

    pub async fn save_link(&self, request: &SaveLinkRequest) -> LinkResult<SaveLinkResponse> {
        let config = self.config.get().await?;
        let token = SessionEvaluator::new(self.config, self.clock)
            .get_token()
            .await?
            .ok_or(LinkError::Unauthenticated)?;

        let url = format!("{}/api/links", config.api_base_url);
        let body = serde_json::to_string(request).map_err(|e| LinkError::Api(e.to_string()))?;

        log::info!("saveLink: POST {} (token length {})", url, token.len());

        let response = self.transport.post_json(&url, &token, body).await.map_err(|e| {
            log::error!("saveLink: fetch failed: {}", e.0);
            LinkError::Network
        })?;

        log::info!("saveLink: response {} {}", response.status, response.status_text);

        interpret_response(response)
    }
}

fn interpret_response(response: HttpResponse) -> LinkResult<SaveLinkResponse> {
    if response.status == 401 {
        return Err(LinkError::SessionExpired);
    }

    if !response.is_success() {
        let preview: String = response.body.chars().take(ERROR_BODY_PREVIEW).collect();
        log::error!(
            "saveLink: API error {} {}: {}",
            response.status,
            response.status_text,
            preview
        );

        let message = serde_json::from_str::<ApiErrorBody>(&response.body)
            .ok()
            .and_then(|body| {
                if let Some(detail) = &body.detail {
                    log::debug!("saveLink: error detail: {}", detail);
                }
                body.error
            })
            .filter(|error| !error.is_empty())
            .unwrap_or_else(|| format!("HTTP {} {}", response.status, response.status_text));

        return Err(LinkError::Api(message));
    }

    match serde_json::from_str::<SaveLinkResponse>(&response.body) {
        Ok(saved) => {
            log::info!("saveLink: success, id {}", saved.id);
            Ok(saved)
        }
        Err(e) => {
            log::error!("saveLink: failed to parse JSON: {}", e);
            Err(LinkError::InvalidResponse)
        }
    }
}
