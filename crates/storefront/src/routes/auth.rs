//! Authentication route handlers.
//!
//! Login and registration go through the backend's auth endpoints; the
//! returned bearer token is kept in the session as [`CurrentCustomer`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::FieldErrors;
use vitrina_core::validation::{RegistrationFields, validate_login, validate_registration};

use crate::backend::{AuthSession, BackendError};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    OptionalAuth, PageContext, clear_current_customer, safe_next_path, set_current_customer,
    set_flash,
};
use crate::models::{CurrentCustomer, Flash};
use crate::services::cart::CartService;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid email or password.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub next: Option<String>,
}

/// Query parameters for the auth pages.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
    /// Set when a backend call rejected the customer's token.
    pub expired: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
    pub email: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub next: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(customer, page))]
pub async fn login_page(
    OptionalAuth(customer): OptionalAuth,
    page: PageContext,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_next_path(query.next.as_deref());
    if customer.is_some() {
        return Redirect::to(&next).into_response();
    }

    let page = if query.expired.is_some() {
        page.with_flash(Flash::info("Your session expired. Please sign in again."))
    } else {
        page
    };

    LoginTemplate {
        page,
        next,
        email: String::new(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next_path(form.next.as_deref());
    let rerender = |errors: FieldErrors, error: Option<&str>, status: StatusCode| {
        (
            status,
            LoginTemplate {
                page: page.clone(),
                next: next.clone(),
                email: form.email.trim().to_string(),
                errors,
                error: error.map(String::from),
            },
        )
            .into_response()
    };

    let email = match validate_login(&form.email, &form.password) {
        Ok(email) => email,
        Err(errors) => return Ok(rerender(errors, None, StatusCode::UNPROCESSABLE_ENTITY)),
    };

    match state.backend().login(&email, &form.password).await {
        Ok(auth) => {
            let name = sign_in(&state, &session, auth).await?;
            set_flash(&session, Flash::success(format!("Welcome back, {name}."))).await;
            Ok(Redirect::to(&next).into_response())
        }
        Err(BackendError::Unauthorized | BackendError::NotFound(_)) => {
            tracing::info!("Login rejected");
            Ok(rerender(
                FieldErrors::new(),
                Some(BAD_CREDENTIALS),
                StatusCode::UNAUTHORIZED,
            ))
        }
        Err(BackendError::Validation { message, fields }) => Ok(rerender(
            fields,
            Some(&message),
            StatusCode::UNPROCESSABLE_ENTITY,
        )),
        Err(e) => Err(e.into()),
    }
}

/// Store the customer in a fresh session and adopt the guest cart.
///
/// Returns the name to greet the customer with.
async fn sign_in(state: &AppState, session: &Session, auth: AuthSession) -> Result<String> {
    let customer = CurrentCustomer::from(auth);
    set_current_customer(session, &customer).await?;
    set_sentry_user(&customer.id, Some(customer.email.as_str()));

    CartService::new(state.backend(), session, Some(&customer))
        .adopt_after_login(&customer)
        .await?;

    tracing::info!(user_id = %customer.id, "Customer signed in");
    Ok(customer.greeting_name().to_string())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(customer, page))]
pub async fn register_page(
    OptionalAuth(customer): OptionalAuth,
    page: PageContext,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_next_path(query.next.as_deref());
    if customer.is_some() {
        return Redirect::to(&next).into_response();
    }

    RegisterTemplate {
        page,
        next,
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// The backend signs the new customer in right away.
#[instrument(skip(state, session, page, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let next = safe_next_path(form.next.as_deref());
    let rerender = |errors: FieldErrors, error: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                page: page.clone(),
                next: next.clone(),
                email: form.email.trim().to_string(),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                errors,
                error,
            },
        )
            .into_response()
    };

    let email = match validate_registration(RegistrationFields {
        email: &form.email,
        password: &form.password,
        password_confirm: &form.password_confirm,
        first_name: &form.first_name,
        last_name: &form.last_name,
    }) {
        Ok(email) => email,
        Err(errors) => return Ok(rerender(errors, None)),
    };

    let result = state
        .backend()
        .register(
            &email,
            &form.password,
            form.first_name.trim(),
            form.last_name.trim(),
        )
        .await;

    match result {
        Ok(auth) => {
            let name = sign_in(&state, &session, auth).await?;
            set_flash(
                &session,
                Flash::success(format!("Welcome, {name}! Your account is ready.")),
            )
            .await;
            Ok(Redirect::to(&next).into_response())
        }
        Err(BackendError::Validation { message, fields }) => Ok(rerender(fields, Some(message))),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The backend token is revoked best-effort; the session is dropped either
/// way, taking the cart mirror and checkout progress with it.
#[instrument(skip(state, session, customer))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Redirect> {
    if let Some(customer) = &customer
        && let Err(e) = state.backend().logout(customer.caller(None)).await
    {
        tracing::warn!(error = %e, "Backend logout failed");
    }

    clear_current_customer(&session).await?;
    session.flush().await?;
    clear_sentry_user();

    set_flash(&session, Flash::info("You have been signed out.")).await;
    Ok(Redirect::to("/"))
}
