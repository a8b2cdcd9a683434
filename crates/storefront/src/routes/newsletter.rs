//! Newsletter subscription route handler.
//!
//! The signup form sits in the footer and on the home page, so the handler
//! answers with a flash and a redirect back to where the form was.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::Email;

use crate::backend::BackendError;
use crate::middleware::{is_local_path, set_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
    pub return_to: Option<String>,
}

/// Subscribe to the newsletter.
///
/// An address that is already subscribed counts as success; the shopper
/// gets what they asked for either way.
#[instrument(skip(state, session, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SubscribeForm>,
) -> Redirect {
    let back = form
        .return_to
        .as_deref()
        .filter(|path| is_local_path(path))
        .unwrap_or("/");

    let Ok(email) = Email::parse(&form.email) else {
        set_flash(&session, Flash::error("Please enter a valid email address.")).await;
        return Redirect::to(back);
    };

    let flash = match state.backend().subscribe_newsletter(&email).await {
        Ok(()) => {
            tracing::info!(domain = email.domain(), "Newsletter subscription");
            Flash::success("Thanks for subscribing!")
        }
        Err(BackendError::Validation { message, .. })
            if message.to_lowercase().contains("already") =>
        {
            Flash::success("You're already subscribed. Thanks!")
        }
        Err(BackendError::Validation { message, .. }) => Flash::error(message),
        Err(e) => {
            tracing::warn!(error = %e, "Newsletter subscription failed");
            Flash::error(e.user_message())
        }
    };
    set_flash(&session, flash).await;

    Redirect::to(back)
}
