//! Checkout wizard steps.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A step of the linear checkout wizard.
///
/// Order is significant: a step can only be entered once every step before
/// it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Review,
}

impl CheckoutStep {
    /// All steps in wizard order.
    pub const ALL: [Self; 3] = [Self::Shipping, Self::Payment, Self::Review];

    /// Zero-based position in the wizard.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Shipping => 0,
            Self::Payment => 1,
            Self::Review => 2,
        }
    }

    /// The following step, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// The preceding step, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Shipping => None,
            Self::Payment => Some(Self::Shipping),
            Self::Review => Some(Self::Payment),
        }
    }

    /// URL segment under `/checkout/`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Review => "review",
        }
    }

    /// Label for the progress indicator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
            Self::Review => "Review",
        }
    }

    /// Absolute path of the step page.
    #[must_use]
    pub fn path(self) -> String {
        format!("/checkout/{}", self.slug())
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
