//! HTTP client for the OpenExam cheatsheet API.
//!
//! Provides a minimal client with bearer-token auth, generic GET/POST/DELETE
//! helpers that map transport and HTTP failures onto [`ClientError`], and the
//! domain methods in [`api`] (list, delete, presigned upload/download,
//! generate, share). The client implements the collaborator traits from
//! `openexam_core::backend`, so the sync engine can use it directly.

pub mod api;

use std::time::Duration;

use openexam_core::constants::{DEFAULT_GENERATE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use openexam_core::models::ApiErrorBody;
use openexam_core::{ClientConfig, ClientError, ClientResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// API path prefix served by the gateway.
pub const API_PREFIX: &str = "/api";

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials (only the login endpoints accept this)
    Anonymous,
}

/// HTTP client for the OpenExam API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
    request_timeout: Duration,
    generate_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> ClientResult<Self> {
        Self::with_timeouts(base_url, auth, DEFAULT_REQUEST_TIMEOUT, DEFAULT_GENERATE_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        auth: Auth,
        request_timeout: Duration,
        generate_timeout: Duration,
    ) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ClientError::NetworkFailure(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            request_timeout,
            generate_timeout,
        })
    }

    /// Create a client from loaded configuration. Uses bearer auth when a token is set.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let auth = match config.access_token {
            Some(ref token) => Auth::Bearer(token.clone()),
            None => Auth::Anonymous,
        };
        Self::with_timeouts(
            config.api_url.clone(),
            auth,
            config.request_timeout,
            config.generate_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn generate_timeout(&self) -> Duration {
        self.generate_timeout
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Anonymous => request,
        }
    }

    /// Send a request and turn transport errors and non-2xx statuses into `ClientError`.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        timeout: Duration,
    ) -> ClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, operation, timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = extract_error_message(&error_text)
            .unwrap_or_else(|| format!("Failed to {}", operation));

        tracing::debug!(
            status = status.as_u16(),
            operation,
            message = %message,
            "API request rejected"
        );

        if status == reqwest::StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(message))
        } else {
            Err(ClientError::server_rejected(status.as_u16(), message))
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        operation: &'static str,
        timeout: Duration,
    ) -> ClientResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(e, operation, timeout))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation: &'static str,
    ) -> ClientResult<T> {
        let mut request = self.apply_auth(self.client.get(self.build_url(path)));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.send(request, operation, self.request_timeout).await?;
        Self::read_json(response, operation, self.request_timeout).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> ClientResult<T> {
        self.post_json_with_timeout(path, body, operation, self.request_timeout)
            .await
    }

    /// POST JSON body with a per-request timeout (long-running endpoints).
    pub async fn post_json_with_timeout<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
        timeout: Duration,
    ) -> ClientResult<T> {
        let request = self
            .apply_auth(self.client.post(self.build_url(path)))
            .json(body)
            .timeout(timeout);

        let response = self.send(request, operation, timeout).await?;
        Self::read_json(response, operation, timeout).await
    }

    /// DELETE request with query parameters. Returns Ok(()) on success.
    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation: &'static str,
    ) -> ClientResult<()> {
        let request = self
            .apply_auth(self.client.delete(self.build_url(path)))
            .query(query);

        self.send(request, operation, self.request_timeout).await?;
        Ok(())
    }

    /// Raw client for requests to presigned storage URLs (no API auth).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn map_transport_error(err: reqwest::Error, operation: &'static str, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::timed_out(operation, timeout)
    } else if err.is_decode() {
        ClientError::NetworkFailure(format!("Malformed response while trying to {}: {}", operation, err))
    } else {
        ClientError::NetworkFailure(format!("Failed to {}: {}", operation, err))
    }
}

/// Pull a human-readable message out of an error body.
///
/// The gateway answers `{status, message}`; the storage service `{success, error}`.
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ApiErrorBody>(trimmed) {
        Ok(parsed) => parsed.message.filter(|m| !m.is_empty()),
        Err(_) => Some(trimmed.to_string()),
    }
}

// Re-export domain response types for convenience.
pub use openexam_core::models::{
    FileDetails, FileRecord, GeneratedFile, PresignedDownloadResponse, PresignedUploadResponse,
    Share,
};
