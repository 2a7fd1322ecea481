//! HTTP transport for the portal API.
//!
//! Every outbound call goes through [`Transport`]: it joins the path onto the
//! fixed base URL, injects the persisted bearer token (or a per-call
//! override), applies the configured timeout, and routes every failure
//! through the error normalizer. It never touches session state.

use std::sync::Arc;

use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::ApiError;

/// HTTP client with automatic bearer injection and error normalization.
pub struct Transport {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
}

impl Transport {
    /// Create a transport over the given config and credential store.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            store,
            http,
        }
    }

    /// GET a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::GET, path, None, None).await
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|_| ApiError::from_invalid_body(0))?;
        self.execute(Method::POST, path, Some(body), None).await
    }

    /// POST with no body, optionally overriding the bearer token for this
    /// call only (the portal-token validation path).
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        token_override: Option<&str>,
    ) -> Result<T, ApiError> {
        self.execute(Method::POST, path, None, token_override).await
    }

    /// PUT a JSON body.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|_| ApiError::from_invalid_body(0))?;
        self.execute(Method::PUT, path, Some(body), None).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token_override: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.request(method.clone(), &url);

        let token = token_override
            .map(str::to_string)
            .or_else(|| self.store.token());
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(ref body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            debug!(%method, %url, error = %e, "Request never completed");
            ApiError::from_send_error(&e)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_send_error(&e))?;

        if !status.is_success() {
            debug!(%method, %url, status = status.as_u16(), "Request failed");
            let body = if text.is_empty() {
                None
            } else {
                // Keep a non-JSON body as a plain string so message
                // extraction can return it as-is.
                Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            };
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&text).map_err(|e| {
            debug!(%method, %url, error = %e, "Response body did not match expected shape");
            ApiError::from_invalid_body(status.as_u16())
        })
    }
}
