//! Static content pages and the not-found fallback.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Path,
    http::Uri,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::PageContext;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub page: PageContext,
}

/// FAQ page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/faq.html")]
pub struct FaqTemplate {
    pub page: PageContext,
}

/// Terms of service page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/terms.html")]
pub struct TermsTemplate {
    pub page: PageContext,
}

/// Privacy policy page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/privacy.html")]
pub struct PrivacyTemplate {
    pub page: PageContext,
}

/// Display a content page by slug.
///
/// # Errors
///
/// Returns 404 for an unknown slug.
#[instrument(skip(page))]
pub async fn show(page: PageContext, Path(slug): Path<String>) -> Result<Response, AppError> {
    Ok(match slug.as_str() {
        "about" => AboutTemplate { page }.into_response(),
        "faq" => FaqTemplate { page }.into_response(),
        "terms" => TermsTemplate { page }.into_response(),
        "privacy" => PrivacyTemplate { page }.into_response(),
        _ => return Err(AppError::NotFound(format!("page {slug}"))),
    })
}

/// Fallback for unmatched paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
