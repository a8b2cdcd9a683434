//! Client for the shop REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for catalog, carts, customers and
//!   orders; the storefront keeps no database of its own
//! - Catalog reads (products, categories, banners) are cached in-process via
//!   `moka` with a configurable TTL
//! - Cart, account and checkout calls are never cached
//!
//! # Identity
//!
//! Every request may carry up to three identities, see [`Caller`]:
//!
//! - `Authorization: Bearer <token>` for a logged-in customer
//! - `X-Cart-Id` for a guest cart
//! - `X-Api-Key` for the storefront itself, when configured
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrina_storefront::backend::{BackendClient, Caller};
//!
//! let client = BackendClient::new(&config.backend)?;
//! let product = client.get_product("yerba-mate-1kg").await?;
//! let cart = client.add_cart_item(Caller::new(None, Some(&cart_id)), &product.id, 2).await?;
//! ```

mod cache;
mod client;
pub mod endpoints;
pub mod types;

pub use client::{BackendClient, Caller};
pub use types::*;

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use vitrina_core::FieldErrors;

/// Maximum length of a backend error body kept in [`BackendError::Api`].
const MAX_ERROR_BODY: usize = 200;

/// Errors that can occur when talking to the shop REST API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The caller's token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the input.
    #[error("Validation failed: {message}")]
    Validation { message: String, fields: FieldErrors },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured API key is not a valid header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BackendError {
    /// Map a non-success status and its body to an error.
    ///
    /// 429 is handled before the body is read, since it needs the
    /// `Retry-After` header.
    #[must_use]
    pub fn from_status(status: u16, path: &str, body: &str) -> Self {
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound(path.to_string()),
            400 | 422 => {
                let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
                let fields = parsed.errors.map(FieldErrors::from).unwrap_or_default();
                let message = parsed
                    .message
                    .or(parsed.error)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "The request was rejected.".to_string());
                Self::Validation { message, fields }
            }
            _ => {
                let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
                let message = parsed
                    .and_then(|p| p.message.or(p.error))
                    .unwrap_or_else(|| body.to_string());
                Self::Api {
                    status,
                    message: message.chars().take(MAX_ERROR_BODY).collect(),
                }
            }
        }
    }

    /// Whether the customer's session should be dropped.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message suitable for showing to a shopper.
    ///
    /// Validation messages come from the backend and are meant for people;
    /// everything else is replaced by a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound(_) => "That item is no longer available.".to_string(),
            Self::RateLimited(_) => {
                "The shop is busy right now. Please try again in a moment.".to_string()
            }
            Self::Unauthorized => "Please sign in to continue.".to_string(),
            _ => "Something went wrong talking to the shop. Please try again.".to_string(),
        }
    }
}

/// Error body shape used by the backend for 4xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<HashMap<String, Vec<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("products/mate".to_string());
        assert_eq!(err.to_string(), "Not found: products/mate");

        let err = BackendError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_status_401_is_unauthorized() {
        let err = BackendError::from_status(401, "orders", "");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_status_404_keeps_path() {
        let err = BackendError::from_status(404, "products/missing", "{}");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: products/missing");
    }

    #[test]
    fn test_validation_body_with_field_errors() {
        let body = r#"{"message":"Invalid address","errors":{"postal_code":["is invalid"],"city":["is required","too short"]}}"#;
        let err = BackendError::from_status(422, "addresses", body);
        match err {
            BackendError::Validation { message, fields } => {
                assert_eq!(message, "Invalid address");
                assert_eq!(fields.get("postal_code"), Some("is invalid"));
                assert_eq!(fields.get("city"), Some("is required"));
                assert_eq!(fields.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_without_body_has_generic_message() {
        let err = BackendError::from_status(400, "cart/items", "not json");
        assert_eq!(err.user_message(), "The request was rejected.");
    }

    #[test]
    fn test_api_error_is_truncated() {
        let body = "x".repeat(1000);
        match BackendError::from_status(500, "cart", &body) {
            BackendError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), MAX_ERROR_BODY);
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_api_error_prefers_json_message() {
        let err = BackendError::from_status(503, "categories", r#"{"error":"maintenance"}"#);
        assert_eq!(err.to_string(), "API error: 503 - maintenance");
    }

    #[test]
    fn test_user_message_hides_internal_details() {
        let err = BackendError::Api {
            status: 500,
            message: "stack trace".to_string(),
        };
        assert!(!err.user_message().contains("stack trace"));
    }
}
