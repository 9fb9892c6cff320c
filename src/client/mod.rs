//! IntelliReport API Client
//!
//! Every call to the API goes through [`AuthenticatedClient`], which owns the
//! bearer-token, refresh-and-retry and forced-logout behavior. Typed
//! endpoints live in [`crate::services`].

mod authenticated;
mod error;
mod request;

pub use authenticated::{AuthenticatedClient, REFRESH_PATH};
pub use error::{ensure_success, extract_message, json_body, ApiError, ApiResult};
pub use request::{ApiRequest, RequestBody, REQUEST_ID_HEADER};
pub use tokio_util::sync::CancellationToken;
