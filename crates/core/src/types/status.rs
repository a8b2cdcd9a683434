//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Human readable label for order pages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "Awaiting payment",
            Self::Paid => "Paid",
            Self::Processing => "Preparing your order",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }

    /// Whether the order can still change state.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::PendingPayment | Self::Paid | Self::Processing | Self::Shipped
        )
    }
}

/// Payment status reported by Mercado Pago on its back URLs.
///
/// The provider appends `status` (or `collection_status`) to the return
/// URL. Values outside the documented set map to `Unknown` instead of
/// failing, since the return page must always render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    Unknown,
}

impl PaymentStatus {
    /// Parse the raw query value leniently.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("approved" | "success") => Self::Approved,
            Some("pending") => Self::Pending,
            Some("in_process" | "in_mediation" | "authorized") => Self::InProcess,
            Some("rejected" | "failure") => Self::Rejected,
            Some("cancelled" | "canceled") => Self::Cancelled,
            Some("refunded" | "charged_back") => Self::Refunded,
            _ => Self::Unknown,
        }
    }

    /// Payment went through.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Payment is still being processed by the provider.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::InProcess)
    }

    /// Payment did not go through; the customer may retry.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !self.is_success() && !self.is_pending()
    }

    /// Human readable label for the payment status page.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "Payment approved",
            Self::Pending | Self::InProcess => "Payment pending",
            Self::Rejected => "Payment rejected",
            Self::Cancelled => "Payment cancelled",
            Self::Refunded => "Payment refunded",
            Self::Unknown => "Payment not completed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_from_query() {
        assert_eq!(PaymentStatus::from_query(Some("approved")), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::from_query(Some(" PENDING ")), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_query(Some("in_process")), PaymentStatus::InProcess);
        assert_eq!(PaymentStatus::from_query(Some("failure")), PaymentStatus::Rejected);
        assert_eq!(PaymentStatus::from_query(Some("null")), PaymentStatus::Unknown);
        assert_eq!(PaymentStatus::from_query(None), PaymentStatus::Unknown);
    }

    #[test]
    fn test_payment_status_classification() {
        assert!(PaymentStatus::Approved.is_success());
        assert!(PaymentStatus::InProcess.is_pending());
        assert!(PaymentStatus::Rejected.is_failure());
        assert!(PaymentStatus::Unknown.is_failure());
        assert!(!PaymentStatus::Pending.is_failure());
    }

    #[test]
    fn test_order_status_wire_format() {
        let status: OrderStatus = serde_json::from_str("\"pending_payment\"").unwrap();
        assert_eq!(status, OrderStatus::PendingPayment);
        assert!(status.is_open());
        assert!(!OrderStatus::Delivered.is_open());
    }
}
