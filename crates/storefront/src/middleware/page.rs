//! Shared per-page context and flash notices.
//!
//! Every full page renders the same header (store name, cart badge, account
//! link) and an optional one-shot notice left by a previous POST.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::current_customer;
use super::csp::CspNonce;
use crate::models::{Flash, session_keys};
use crate::services::cart::CartMirror;
use crate::state::AppState;

/// Data every page template needs for the layout.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub store_name: String,
    /// CSP nonce for inline scripts.
    pub nonce: String,
    pub cart_count: u32,
    /// First name of the signed-in customer.
    pub customer_name: Option<String>,
    pub flash: Option<Flash>,
}

impl PageContext {
    /// Build the context, consuming any pending flash.
    ///
    /// Handlers that may redirect before rendering should call this after
    /// deciding to render, so the flash survives the redirect.
    pub async fn load(state: &AppState, session: &Session, nonce: String) -> Self {
        let cart_count = session
            .get::<CartMirror>(session_keys::CART)
            .await
            .ok()
            .flatten()
            .map_or(0, |cart| cart.item_count);
        let customer_name =
            current_customer(session)
                .await
                .map(|customer| customer.greeting_name().to_string());

        Self {
            store_name: state.config().store_name.clone(),
            nonce,
            cart_count,
            customer_name,
            flash: take_flash(session).await,
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.customer_name.is_some()
    }

    /// Show a notice on this render without going through the session.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();

        Ok(match parts.extensions.get::<Session>().cloned() {
            Some(session) => Self::load(state, &session, nonce).await,
            None => Self {
                store_name: state.config().store_name.clone(),
                nonce,
                cart_count: 0,
                customer_name: None,
                flash: None,
            },
        })
    }
}

/// Leave a notice for the next rendered page.
///
/// Failures are logged; a lost notice is not worth failing the request.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Remove and return the pending notice.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
