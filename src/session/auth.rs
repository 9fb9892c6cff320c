//! Auth State Holder
//!
//! Single source of truth for "is a user logged in" and "who is it".
//!
//! ```text
//! Unknown ──initialize──▶ Authenticated(user) ──logout / clear──▶ Anonymous
//!    │                          ▲      │
//!    └────────initialize───▶ Anonymous └── update_user (payload only)
//!                               │
//!                               └──login──▶ Authenticated(user)
//! ```

use std::sync::RwLock;

use super::store::{Session, SessionStore};
use super::token;
use super::SessionResult;
use crate::models::{TokenPair, UserProfile};

/// Auth state including the cached profile
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Storage not checked yet
    Unknown,
    Authenticated(UserProfile),
    Anonymous,
}

/// Auth state without payload, for guards and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Authenticated,
    Anonymous,
}

impl AuthState {
    pub fn status(&self) -> AuthStatus {
        match self {
            AuthState::Unknown => AuthStatus::Unknown,
            AuthState::Authenticated(_) => AuthStatus::Authenticated,
            AuthState::Anonymous => AuthStatus::Anonymous,
        }
    }
}

/// Owns the persisted session and the auth state machine
///
/// Shared as `Arc<AuthContext>` with every service that needs credentials;
/// all session mutation goes through it.
pub struct AuthContext {
    store: SessionStore,
    state: RwLock<AuthState>,
}

impl AuthContext {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            state: RwLock::new(AuthState::Unknown),
        }
    }

    /// Read storage and settle the state
    ///
    /// A session is accepted only if its access token carries a future `exp`
    /// claim and the cached profile is readable. Anything else is cleared.
    /// Never touches the network.
    pub fn initialize(&self) -> AuthStatus {
        let settled = match self.store.load() {
            Ok(Some(Session {
                access_token,
                user: Some(user),
                ..
            })) if token::status(&access_token).is_valid() => AuthState::Authenticated(user),
            Ok(Some(_)) => {
                tracing::debug!("Stored session is expired or incomplete, discarding");
                self.clear_storage();
                AuthState::Anonymous
            }
            Ok(None) => {
                self.clear_storage();
                AuthState::Anonymous
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session, discarding");
                self.clear_storage();
                AuthState::Anonymous
            }
        };

        let status = settled.status();
        self.set_state(settled);
        tracing::debug!(?status, "Auth state initialized");
        status
    }

    pub fn state(&self) -> AuthState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.state.read().unwrap_or_else(|e| e.into_inner()).status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.state.read().unwrap_or_else(|e| e.into_inner()) {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    /// Persist the tokens and profile, then become authenticated
    pub fn login(&self, user: UserProfile, tokens: &TokenPair) -> SessionResult<()> {
        self.store.save(&user, tokens)?;
        tracing::info!(user = %user.email, "Logged in");
        self.set_state(AuthState::Authenticated(user));
        Ok(())
    }

    /// Clear all persisted session values and become anonymous
    ///
    /// Storage failures are logged; the in-memory state is reset regardless.
    pub fn logout(&self) {
        self.clear_storage();
        self.set_state(AuthState::Anonymous);
        tracing::info!("Logged out");
    }

    /// Forced clear after an unrecoverable authentication failure
    pub fn clear_session(&self) {
        self.clear_storage();
        self.set_state(AuthState::Anonymous);
        tracing::warn!("Session cleared");
    }

    /// Replace the cached profile; the state stays authenticated
    pub fn update_user(&self, user: UserProfile) -> SessionResult<()> {
        self.store.save_user(&user)?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let AuthState::Authenticated(current) = &mut *state {
            *current = user;
        }
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_entry(self.store.access_token())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_entry(self.store.refresh_token())
    }

    /// Store the result of a successful token refresh
    pub(crate) fn store_refreshed_tokens(
        &self,
        access: &str,
        refresh: Option<&str>,
    ) -> SessionResult<()> {
        self.store.save_tokens(access, refresh)
    }

    fn read_entry(&self, entry: SessionResult<Option<String>>) -> Option<String> {
        entry.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read session entry");
            None
        })
    }

    fn clear_storage(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear stored session");
        }
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::test_support::{expired_jwt, fresh_jwt};
    use crate::session::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn user(email: &str) -> UserProfile {
        UserProfile {
            id: 1,
            email: email.to_string(),
            username: "ana".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            company: Some("Acme".to_string()),
            position: None,
            created_at: Utc::now(),
        }
    }

    fn tokens(access: String) -> TokenPair {
        TokenPair {
            access,
            refresh: "ref1".to_string(),
        }
    }

    #[test]
    fn test_starts_unknown() {
        let auth = AuthContext::new(SessionStore::in_memory());
        assert_eq!(auth.status(), AuthStatus::Unknown);
        assert!(auth.user().is_none());
    }

    #[test]
    fn test_initialize_with_valid_session() {
        let store = SessionStore::in_memory();
        store.save(&user("a@b.com"), &tokens(fresh_jwt())).unwrap();

        let auth = AuthContext::new(store);
        assert_eq!(auth.initialize(), AuthStatus::Authenticated);
        assert_eq!(auth.user().unwrap().email, "a@b.com");
    }

    #[test]
    fn test_initialize_with_expired_token_settles_anonymous() {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());
        store.save(&user("a@b.com"), &tokens(expired_jwt())).unwrap();

        let auth = AuthContext::new(store);
        assert_eq!(auth.initialize(), AuthStatus::Anonymous);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_initialize_rejects_opaque_token() {
        let store = SessionStore::in_memory();
        store.save(&user("a@b.com"), &tokens("tok1".to_string())).unwrap();

        let auth = AuthContext::new(store);
        assert_eq!(auth.initialize(), AuthStatus::Anonymous);
        assert!(auth.access_token().is_none());
    }

    #[test]
    fn test_initialize_without_session() {
        let auth = AuthContext::new(SessionStore::in_memory());
        assert_eq!(auth.initialize(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_login_then_logout() {
        let backend = Arc::new(MemoryStore::new());
        let auth = AuthContext::new(SessionStore::new(backend.clone()));
        auth.initialize();

        auth.login(user("a@b.com"), &tokens("tok1".to_string())).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.access_token().as_deref(), Some("tok1"));
        assert_eq!(auth.refresh_token().as_deref(), Some("ref1"));
        assert_eq!(backend.len(), 3);

        auth.logout();
        assert_eq!(auth.status(), AuthStatus::Anonymous);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_update_user_keeps_state() {
        let auth = AuthContext::new(SessionStore::in_memory());
        auth.login(user("a@b.com"), &tokens("tok1".to_string())).unwrap();

        auth.update_user(user("new@b.com")).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.user().unwrap().email, "new@b.com");
        assert_eq!(auth.access_token().as_deref(), Some("tok1"));
    }
}
