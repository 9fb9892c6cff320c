//! Authenticated request wrapper
//!
//! Attaches the bearer token to every call, recovers once from an expired
//! access token by refreshing it, and clears the session when recovery is
//! impossible. Concurrent refreshes are coalesced: only one refresh call is
//! in flight at a time, and callers that queued behind it reuse its token.

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::request::ApiRequest;
use crate::config::ApiConfig;
use crate::models::RefreshResponse;
use crate::routes::{Navigator, Route};
use crate::session::{token, AuthContext};

pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// HTTP client bound to a session
pub struct AuthenticatedClient {
    http: Client,
    base_url: String,
    auth: Arc<AuthContext>,
    navigator: Arc<dyn Navigator>,
    /// Held for the duration of a refresh call
    refresh_gate: Mutex<()>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

impl AuthenticatedClient {
    pub fn new(
        config: &ApiConfig,
        auth: Arc<AuthContext>,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::with_http(
            http,
            &config.normalized_base_url(),
            auth,
            navigator,
        ))
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        auth: Arc<AuthContext>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            navigator,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an authenticated request
    ///
    /// Returns the response of the last attempt unmodified unless it is a
    /// 401: a first 401 triggers one refresh and one retry, a 401 on the
    /// retry is [`ApiError::Unauthorized`]. Without a stored access token
    /// nothing is sent and the caller is redirected to login.
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<Response> {
        let request_id = Uuid::new_v4().to_string();

        let Some(mut access) = self.auth.access_token() else {
            tracing::debug!(path = %request.path(), "No access token, redirecting to login");
            return Err(self.abandon_session(ApiError::NotAuthenticated));
        };

        let mut refreshed = false;
        if token::status(&access).is_expired() {
            tracing::debug!(path = %request.path(), "Access token expired before sending");
            access = match self.refresh_after(&access).await {
                Some(fresh) => fresh,
                None => return Err(self.abandon_session(ApiError::SessionExpired)),
            };
            refreshed = true;
        }

        let response = self.execute(request, Some(&access), &request_id).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if refreshed {
            tracing::warn!(path = %request.path(), "Rejected with a freshly refreshed token");
            return Err(ApiError::from_response(response).await);
        }

        tracing::debug!(path = %request.path(), request_id = %request_id, "Got 401, refreshing token");
        let Some(fresh) = self.refresh_after(&access).await else {
            return Err(self.abandon_session(ApiError::SessionExpired));
        };

        let retry = self.execute(request, Some(&fresh), &request_id).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %request.path(), "Retry rejected, giving up");
            return Err(ApiError::from_response(retry).await);
        }

        Ok(retry)
    }

    /// [`send`](Self::send), abandoned as soon as `cancel` fires
    pub async fn send_until(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> ApiResult<Response> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(path = %request.path(), "Request cancelled");
                Err(ApiError::Cancelled)
            }
            result = self.send(request) => result,
        }
    }

    /// Send without credentials or refresh handling
    pub async fn send_public(&self, request: &ApiRequest) -> ApiResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        self.execute(request, None, &request_id).await
    }

    /// Send with the current token, if any, but never refresh or redirect
    pub async fn send_once(&self, request: &ApiRequest) -> ApiResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let access = self.auth.access_token();
        self.execute(request, access.as_deref(), &request_id).await
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Performs at most one network call. On any failure the session is
    /// cleared and `None` is returned.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let Some(refresh) = self.auth.refresh_token() else {
            tracing::debug!("No refresh token stored");
            self.auth.clear_session();
            return None;
        };

        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let response = match self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Token refresh rejected");
                self.auth.clear_session();
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                self.auth.clear_session();
                return None;
            }
        };

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh returned an unreadable body");
                self.auth.clear_session();
                return None;
            }
        };

        if let Err(e) = self
            .auth
            .store_refreshed_tokens(&body.access, body.refresh.as_deref())
        {
            tracing::error!(error = %e, "Failed to persist refreshed token");
            self.auth.clear_session();
            return None;
        }

        tracing::info!("Access token refreshed");
        Some(body.access)
    }

    /// Refresh unless another caller already replaced `stale`
    async fn refresh_after(&self, stale: &str) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;

        match self.auth.access_token() {
            Some(current) if current != stale && !token::status(&current).is_expired() => {
                tracing::debug!("Reusing token from a concurrent refresh");
                return Some(current);
            }
            // A concurrent refresh failed and cleared the session
            None => return None,
            Some(_) => {}
        }

        self.refresh_access_token().await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        request_id: &str,
    ) -> ApiResult<Response> {
        let builder = request.build(&self.http, &self.base_url, bearer, request_id)?;
        let response = builder.send().await.map_err(ApiError::transport)?;

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            status = %response.status(),
            request_id = %request_id,
            "API response"
        );
        Ok(response)
    }

    fn abandon_session(&self, error: ApiError) -> ApiError {
        self.auth.clear_session();
        self.navigator.navigate(Route::Login);
        error
    }
}
