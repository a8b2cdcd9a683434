//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::FieldErrors;
use vitrina_core::validation::validate_contact;

use crate::backend::BackendError;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, set_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub form: ContactForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Display the contact form, prefilled for signed-in customers.
#[instrument(skip(customer, page))]
pub async fn show(OptionalAuth(customer): OptionalAuth, page: PageContext) -> ContactTemplate {
    let form = customer.map_or_else(ContactForm::default, |customer| ContactForm {
        name: customer.full_name(),
        email: customer.email.to_string(),
        message: String::new(),
    });

    ContactTemplate {
        page,
        form,
        errors: FieldErrors::new(),
        error: None,
    }
}

/// Send a contact message.
#[instrument(skip(state, session, page, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let email = match validate_contact(&form.name, &form.email, &form.message) {
        Ok(email) => email,
        Err(errors) => return Ok(rerender(page, form, errors, None)),
    };

    match state
        .backend()
        .send_contact(form.name.trim(), &email, form.message.trim())
        .await
    {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Thanks for writing! We'll get back to you soon."),
            )
            .await;
            Ok(Redirect::to("/contact").into_response())
        }
        Err(BackendError::Validation { message, fields }) => {
            Ok(rerender(page, form, fields, Some(message)))
        }
        Err(e) => Err(e.into()),
    }
}

fn rerender(
    page: PageContext,
    form: ContactForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ContactTemplate {
            page,
            form,
            errors,
            error,
        },
    )
        .into_response()
}
