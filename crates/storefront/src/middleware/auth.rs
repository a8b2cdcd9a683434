//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in customer in route handlers,
//! plus the helpers that keep the session's customer in sync with the
//! backend token.

use axum::{
    extract::{FromRequestParts, OriginalUri, Request},
    http::{StatusCode, header::ACCEPT, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::SessionExpired;
use crate::models::{CurrentCustomer, session_keys};

/// Where to land after login when no usable `next` was given.
pub const DEFAULT_AFTER_LOGIN: &str = "/account";

/// Extractor that requires a signed-in customer.
///
/// If the customer is not logged in, returns a redirect to the login page
/// with the original path in `next`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", customer.greeting_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when authentication is required but the customer is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for HTML requests).
    RedirectToLogin { next: String },
    /// Unauthorized response (for JSON requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// `/auth/login?next=<encoded>`.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/auth/login?next={}", urlencoding::encode(next))
}

/// Whether `path` stays on this site.
///
/// Only paths starting with a single `/` are accepted, so
/// `//evil.example` and `https://…` cannot turn a redirect into an open one.
#[must_use]
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

/// The `next` target if it is a local path, else the account page.
#[must_use]
pub fn safe_next_path(next: Option<&str>) -> String {
    next.map(str::trim)
        .filter(|path| is_local_path(path))
        .map_or_else(|| DEFAULT_AFTER_LOGIN.to_string(), String::from)
}

fn wants_json(parts: &Parts) -> bool {
    parts
        .headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let parts: &Parts = parts;
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let customer: Option<CurrentCustomer> = session
            .get(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten();

        customer.map(Self).ok_or_else(|| {
            if wants_json(parts) {
                return AuthRejection::Unauthorized;
            }
            // Nested routers see a stripped URI; the original keeps the prefix
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0);
            let next = uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), ToString::to_string);
            AuthRejection::RedirectToLogin { next }
        })
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if the customer is not logged in.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => current_customer(session).await,
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Read the signed-in customer, treating session errors as signed out.
pub async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current customer in the session.
///
/// Cycles the session ID first so a pre-login session cookie cannot be
/// reused after sign-in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Helper to clear the current customer from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}

/// Drop the customer when a handler reports that the backend rejected
/// their token (see [`SessionExpired`]).
///
/// Must sit inside the session layer.
pub async fn session_expiry_middleware(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_some() {
        tracing::info!("Backend rejected customer token, signing out");
        if let Err(e) = clear_current_customer(&session).await {
            tracing::warn!(error = %e, "Failed to clear expired customer");
        }
        if let Err(e) = session.remove_value(session_keys::CART).await {
            tracing::warn!(error = %e, "Failed to clear cart after expiry");
        }
        crate::error::clear_sentry_user();
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next_path(Some("/checkout")), "/checkout");
        assert_eq!(
            safe_next_path(Some("/account/orders?page=2")),
            "/account/orders?page=2"
        );
    }

    #[test]
    fn test_safe_next_rejects_open_redirects() {
        for next in [
            "https://evil.example",
            "//evil.example",
            "/\\evil.example",
            "evil",
            "",
            "/ok\r\nSet-Cookie: x",
        ] {
            assert_eq!(safe_next_path(Some(next)), DEFAULT_AFTER_LOGIN, "{next}");
        }
        assert_eq!(safe_next_path(None), DEFAULT_AFTER_LOGIN);
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(
            login_url("/checkout/review?x=1"),
            "/auth/login?next=%2Fcheckout%2Freview%3Fx%3D1"
        );
    }

    #[test]
    fn test_rejection_redirects_with_next() {
        let response = AuthRejection::RedirectToLogin {
            next: "/account".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/auth/login?next=%2Faccount")
        );
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
