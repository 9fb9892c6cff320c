//! # IntelliReport
//!
//! Client for the IntelliReport sales-analytics API. Users upload CSV sales
//! data, the server computes reports, and this crate gives authenticated
//! access to uploads, dashboards, reports and PDF export.
//!
//! ## Features
//!
//! - **Authenticated transport**: bearer token on every call, one transparent
//!   refresh and retry on expiry, shared between concurrent callers
//! - **Persistent session**: tokens and cached profile survive restarts
//! - **Route guard**: protected screens redirect anonymous users to login
//! - **Local validation**: bad uploads and forms never reach the network
//!
//! ## Modules
//!
//! - [`client`]: Authenticated HTTP client and error taxonomy
//! - [`session`]: Session storage and the authentication state machine
//! - [`routes`]: Routes, navigation and the route guard
//! - [`services`]: Typed endpoint wrappers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intellireport::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!
//!     let auth = Arc::new(AuthContext::new(SessionStore::file(config.session.path())));
//!     auth.initialize();
//!
//!     let client = Arc::new(AuthenticatedClient::new(
//!         &config.api,
//!         auth.clone(),
//!         Arc::new(LogNavigator),
//!     )?);
//!
//!     let auth_service = AuthService::new(client.clone());
//!     auth_service
//!         .login(&Credentials {
//!             email: "a@b.com".to_string(),
//!             password: "secret1".to_string(),
//!         })
//!         .await?;
//!
//!     let reports = ReportService::new(client);
//!     let dashboard = reports.dashboard().await?;
//!     println!("{} reports", dashboard.statistics.total_reports);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod forms;
pub mod models;
pub mod output;
pub mod routes;
pub mod services;
pub mod session;
pub mod upload;

// Re-export top-level types for convenience
pub use client::{ApiError, ApiRequest, ApiResult, AuthenticatedClient, CancellationToken};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, SessionConfig, UploadConfig};

pub use models::{
    AuthResponse, ChartData, Credentials, CsvFile, DashboardData, DashboardStats, FileStatus,
    PdfResponse, ProfileUpdate, Registration, Report, ReportSummary, TokenPair, UploadResponse,
    UserProfile,
};

pub use routes::{GuardDecision, LogNavigator, Navigator, Route, RouteGuard};

pub use services::{AuthService, FileService, ReportService};

pub use session::{AuthContext, AuthState, AuthStatus, SessionError, SessionStore};

pub use upload::{CsvUpload, UploadError};
