//! Routes and Route Guard
//!
//! Screens of the application, the navigation seam used for redirects, and
//! the guard that keeps anonymous users out of protected screens.

use std::fmt;
use std::sync::Mutex;

use crate::session::{AuthContext, AuthStatus};

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Logout,
    Dashboard,
    Upload,
    Reports,
    ReportDetail(u64),
    Profile,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Logout => "/logout".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Upload => "/upload".to_string(),
            Route::Reports => "/reports".to_string(),
            Route::ReportDetail(id) => format!("/reports/{id}"),
            Route::Profile => "/profile".to_string(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Performs navigation on behalf of the client and the guard
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Logs the redirect; for contexts with nothing to navigate
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = %route, "Redirect");
    }
}

/// Remembers every navigation
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Route> {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route);
    }
}

/// What to show for a requested route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state not settled yet; show a neutral placeholder
    Loading,
    /// Go elsewhere; the requested route is discarded
    Redirect(Route),
    Render(Route),
}

/// Gate for screens that need an authenticated user
pub struct RouteGuard<'a> {
    auth: &'a AuthContext,
    navigator: &'a dyn Navigator,
}

impl<'a> RouteGuard<'a> {
    pub fn new(auth: &'a AuthContext, navigator: &'a dyn Navigator) -> Self {
        Self { auth, navigator }
    }

    /// Decide without side effects
    pub fn resolve(&self, route: Route) -> GuardDecision {
        decide(route, self.auth.status())
    }

    /// Decide and perform the redirect, if any
    pub fn enter(&self, route: Route) -> GuardDecision {
        let decision = self.resolve(route);
        if let GuardDecision::Redirect(target) = decision {
            tracing::debug!(requested = %route, target = %target, "Route guarded");
            self.navigator.navigate(target);
        }
        decision
    }
}

fn decide(route: Route, status: AuthStatus) -> GuardDecision {
    if !route.requires_auth() {
        return GuardDecision::Render(route);
    }

    match status {
        AuthStatus::Unknown => GuardDecision::Loading,
        AuthStatus::Anonymous => GuardDecision::Redirect(Route::Login),
        AuthStatus::Authenticated => GuardDecision::Render(route),
    }
}
