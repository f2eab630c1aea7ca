//! Event Service HTTP adapter.
//!
//! Every request reads the bearer credential from the shared
//! [`SessionContext`] at send time. A `401` on a non-auth endpoint triggers one
//! credential refresh through the registered [`CredentialRefresher`] (which
//! coalesces concurrent refreshes) and one retry of the same request, with the
//! same idempotency key.

mod ports;

use std::sync::{OnceLock, Weak};

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use ag_core::ports::{ApiError, CredentialRefresher};
use ag_core::{AppConfig, IdempotencyKey, SessionContext};

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

pub struct HttpEventService {
    base_url: String,
    client: Client,
    session: SessionContext,
    refresher: OnceLock<Weak<dyn CredentialRefresher>>,
}

/// One logical request; may be sent twice when the credential is refreshed.
pub(crate) struct ApiRequest<'a> {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    key: Option<&'a IdempotencyKey>,
    reauth: bool,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            key: None,
            reauth: true,
        }
    }

    pub(crate) fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub(crate) fn idempotency_key(mut self, key: &'a IdempotencyKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Auth endpoints must never recurse into a credential refresh.
    pub(crate) fn without_reauth(mut self) -> Self {
        self.reauth = false;
        self
    }
}

impl HttpEventService {
    pub fn new(config: &AppConfig, session: SessionContext) -> Result<Self, ApiError> {
        let mut builder = Client::builder().cookie_store(true);
        // zero means "not configured"; reqwest would read it as an instant timeout
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(config.request_timeout());
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
            session,
            refresher: OnceLock::new(),
        })
    }

    /// Registers the component that renews credentials after a `401`.
    ///
    /// Only the first registration takes effect.
    pub fn set_refresher(&self, refresher: Weak<dyn CredentialRefresher>) {
        if self.refresher.set(refresher).is_err() {
            warn!("Credential refresher already registered, ignoring");
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
    ) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(format!("{} {}: {err}", request.method, request.path)))
    }

    pub(crate) async fn send(&self, request: ApiRequest<'_>) -> Result<(), ApiError> {
        self.execute(&request).await.map(|_| ())
    }

    async fn execute(&self, request: &ApiRequest<'_>) -> Result<Response, ApiError> {
        let mut response = self.dispatch(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED && request.reauth {
            if let Some(refresher) = self.refresher.get().and_then(Weak::upgrade) {
                debug!(path = %request.path, "Unauthorized, refreshing credential");
                if refresher.refresh_credentials().await {
                    response = self.dispatch(request).await?;
                }
            }
        }

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn dispatch(&self, request: &ApiRequest<'_>) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if let Some(token) = self.session.access_token().filter(|t| !t.is_empty()) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }
        if let Some(key) = request.key {
            builder = builder.header(IDEMPOTENCY_KEY, key.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status().as_u16(),
            "Event Service response"
        );
        Ok(response)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network("request timed out".to_string())
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Status plus the parsed body; the body's `message` becomes the user message.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<serde_json::Value>(&text).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string);

    ApiError::Http {
        status,
        message,
        body,
    }
}
