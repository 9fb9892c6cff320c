//! Session Management
//!
//! Client-side session state: the access token, the refresh token and the
//! cached user profile.
//!
//! ## Architecture
//!
//! - **KeyValueStore**: durable string storage (file-backed or in-memory)
//! - **SessionStore**: typed view over the three session entries
//! - **AuthContext**: single owner of the session and the auth state machine
//! - **token**: expiry-claim inspection for JWT access tokens

mod auth;
mod store;
pub mod token;

pub use auth::{AuthContext, AuthState, AuthStatus};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, Session, SessionStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY, USER_KEY,
};

use thiserror::Error;

/// Errors raised by session persistence
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
