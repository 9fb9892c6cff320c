//! Typed API Services
//!
//! One service per area of the API. All of them share a single
//! [`AuthenticatedClient`](crate::client::AuthenticatedClient), so token
//! refresh and forced logout behave the same for every call.

mod auth;
mod files;
mod reports;

pub use auth::{AuthService, LOGOUT_PATH};
pub use files::FileService;
pub use reports::ReportService;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::client::AuthenticatedClient;
    use crate::models::{TokenPair, UserProfile};
    use crate::routes::RecordingNavigator;
    use crate::session::{AuthContext, MemoryStore, SessionStore};
    use chrono::Utc;
    use httpmock::MockServer;
    use std::sync::Arc;

    pub struct TestClient {
        pub client: Arc<AuthenticatedClient>,
        pub auth: Arc<AuthContext>,
        pub navigator: Arc<RecordingNavigator>,
        pub backend: Arc<MemoryStore>,
    }

    pub fn user() -> UserProfile {
        UserProfile {
            id: 1,
            email: "a@b.com".to_string(),
            username: "ana".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            company: None,
            position: None,
            created_at: Utc::now(),
        }
    }

    /// Client against `server`, logged in with `tok1`/`ref1` when `logged_in`
    pub fn test_client(server: &MockServer, logged_in: bool) -> TestClient {
        let backend = Arc::new(MemoryStore::new());
        let auth = Arc::new(AuthContext::new(SessionStore::new(backend.clone())));
        if logged_in {
            auth.login(
                user(),
                &TokenPair {
                    access: "tok1".to_string(),
                    refresh: "ref1".to_string(),
                },
            )
            .unwrap();
        } else {
            auth.initialize();
        }

        let navigator = Arc::new(RecordingNavigator::new());
        let client = Arc::new(AuthenticatedClient::with_http(
            reqwest::Client::new(),
            &server.base_url(),
            auth.clone(),
            navigator.clone(),
        ));

        TestClient {
            client,
            auth,
            navigator,
            backend,
        }
    }

    pub fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "email": "a@b.com",
            "username": "ana",
            "first_name": "Ana",
            "last_name": "Ruiz",
            "company": null,
            "position": null,
            "created_at": "2024-01-10T09:00:00Z"
        })
    }

    pub fn csv_file_json(id: u64, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "original_name": "data.csv",
            "status": status,
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:05Z"
        })
    }
}
