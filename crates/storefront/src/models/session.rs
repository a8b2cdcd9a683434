//! Session-related types.
//!
//! Types stored in the session for authentication state and one-shot
//! notices.

use std::fmt;

use serde::{Deserialize, Serialize};

use vitrina_core::{CartId, Email, UserId};

use crate::backend::{AuthSession, Caller};

/// Session-stored customer identity.
///
/// Holds the backend token, so `Debug` redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Backend user ID.
    pub id: UserId,
    /// Customer's email address.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Bearer token issued by the backend at login.
    pub token: String,
}

impl CurrentCustomer {
    /// Caller identity for backend requests, optionally carrying a cart.
    #[must_use]
    pub fn caller<'a>(&'a self, cart_id: Option<&'a CartId>) -> Caller<'a> {
        Caller::new(Some(&self.token), cart_id)
    }

    /// First name, falling back to the email's local part.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        let first = self.first_name.trim();
        if first.is_empty() {
            self.email
                .as_str()
                .split('@')
                .next()
                .unwrap_or_else(|| self.email.as_str())
        } else {
            first
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

impl From<AuthSession> for CurrentCustomer {
    fn from(auth: AuthSession) -> Self {
        Self {
            id: auth.user.id,
            email: auth.user.email,
            first_name: auth.user.first_name,
            last_name: auth.user.last_name,
            token: auth.token,
        }
    }
}

impl fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Kind of a flash notice, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

/// One-shot notice shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    /// CSS modifier class, e.g. `flash--error`.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "flash--success",
            FlashKind::Error => "flash--error",
            FlashKind::Info => "flash--info",
        }
    }
}

/// Session keys.
pub mod session_keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the mirrored cart.
    pub const CART: &str = "cart";

    /// Key for the checkout wizard state.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the pending one-shot notice.
    pub const FLASH: &str = "flash";

    /// Key for the order awaiting an off-site payment.
    pub const PENDING_ORDER: &str = "pending_order";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(first_name: &str) -> CurrentCustomer {
        CurrentCustomer {
            id: UserId::new("u1"),
            email: Email::parse("ana@example.com").unwrap_or_else(|e| panic!("{e}")),
            first_name: first_name.to_string(),
            last_name: "Pérez".to_string(),
            token: "tok-123".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", customer("Ana"));
        assert!(!debug.contains("tok-123"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_greeting_name_falls_back_to_email() {
        assert_eq!(customer("Ana").greeting_name(), "Ana");
        assert_eq!(customer("  ").greeting_name(), "ana");
    }

    #[test]
    fn test_flash_css_class() {
        assert_eq!(Flash::error("x").css_class(), "flash--error");
        assert_eq!(Flash::success("x").kind, FlashKind::Success);
    }
}
