//! Authentication endpoints
//!
//! Login and registration create the session; logout always clears it,
//! whether or not the server hears about it.

use serde::Serialize;
use std::sync::Arc;

use crate::client::{json_body, ApiRequest, ApiResult, AuthenticatedClient};
use crate::forms;
use crate::models::{AuthResponse, Credentials, ProfileUpdate, Registration, UserProfile};

pub const LOGOUT_PATH: &str = "/auth/logout/";

#[derive(Serialize)]
struct LogoutRequest<'a> {
    refresh_token: &'a str,
}

/// `/auth/*` endpoints
pub struct AuthService {
    client: Arc<AuthenticatedClient>,
}

impl AuthService {
    pub fn new(client: Arc<AuthenticatedClient>) -> Self {
        Self { client }
    }

    /// Log in and store the returned session
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        forms::validate_credentials(credentials)?;

        let request = ApiRequest::post("/auth/login/").json(credentials)?;
        let response = self.client.send_public(&request).await?;
        let auth: AuthResponse = json_body(response).await?;

        self.client.auth().login(auth.user.clone(), &auth.tokens())?;
        Ok(auth)
    }

    /// Create an account; the new user is logged in right away
    pub async fn register(&self, registration: &Registration) -> ApiResult<AuthResponse> {
        forms::validate_registration(registration)?;

        let request = ApiRequest::post("/auth/register/").json(registration)?;
        let response = self.client.send_public(&request).await?;
        let auth: AuthResponse = json_body(response).await?;

        self.client.auth().login(auth.user.clone(), &auth.tokens())?;
        Ok(auth)
    }

    /// Tell the server, then clear the local session regardless of the outcome
    pub async fn logout(&self) {
        let auth = self.client.auth();

        if let Some(refresh) = auth.refresh_token() {
            let notify = ApiRequest::post(LOGOUT_PATH).json(&LogoutRequest {
                refresh_token: &refresh,
            });
            let outcome = match notify {
                Ok(request) => self.client.send_once(&request).await.map(|r| r.status()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(status) if status.is_success() => {
                    tracing::debug!("Server-side logout acknowledged")
                }
                Ok(status) => tracing::debug!(%status, "Server-side logout rejected"),
                Err(e) => tracing::debug!(error = %e, "Server-side logout failed"),
            }
        }

        auth.logout();
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        let response = self.client.send(&ApiRequest::get("/auth/profile/")).await?;
        json_body(response).await
    }

    /// Update the profile and the cached copy in the session
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        forms::validate_profile_update(update)?;

        let request = ApiRequest::put("/auth/profile/").json(update)?;
        let response = self.client.send(&request).await?;
        let user: UserProfile = json_body(response).await?;

        self.client.auth().update_user(user.clone())?;
        Ok(user)
    }

    pub async fn user_info(&self) -> ApiResult<UserProfile> {
        let response = self.client.send(&ApiRequest::get("/auth/user-info/")).await?;
        json_body(response).await
    }
}
