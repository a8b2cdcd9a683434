//! Endpoint paths, relative to the configured API base URL.
//!
//! Paths never start with `/` so that `Url::join` keeps any base path
//! (e.g. `https://api.example.com/v1/`).

use super::BackendError;

pub const PRODUCTS: &str = "products";
pub const CATEGORIES: &str = "categories";
pub const BANNERS: &str = "marketing/banners";

pub const CART: &str = "cart";
pub const CART_ITEMS: &str = "cart/items";
pub const CART_MERGE: &str = "cart/merge";

pub const AUTH_LOGIN: &str = "auth/login";
pub const AUTH_REGISTER: &str = "auth/register";
pub const AUTH_LOGOUT: &str = "auth/logout";

pub const ORDERS: &str = "orders";
pub const ADDRESSES: &str = "addresses";

pub const SHIPPING_OPTIONS: &str = "checkout/shipping-options";
pub const PAYMENT_METHODS: &str = "checkout/payment-methods";
pub const CHECKOUT: &str = "checkout";

pub const NEWSLETTER: &str = "newsletter";
pub const CONTACT: &str = "contact";

/// Header carrying the guest cart id.
pub const CART_ID_HEADER: &str = "X-Cart-Id";
/// Header carrying the storefront's API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";
/// Header making checkout submission safe to retry.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// `"{collection}/{id}"` with the id percent-encoded as one path segment.
///
/// # Errors
///
/// Returns `NotFound` for a blank id or a dot segment. Percent-encoding
/// leaves `.` alone and `Url::join` resolves `.` and `..` against the
/// collection, so those would address a different resource.
pub fn item(collection: &str, id: &str) -> Result<String, BackendError> {
    if id.trim().is_empty() || id == "." || id == ".." {
        return Err(BackendError::NotFound(format!("{collection}/{id}")));
    }
    Ok(format!("{collection}/{}", urlencoding::encode(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_encodes_segment() {
        assert_eq!(
            item(PRODUCTS, "mate-calabaza").ok().as_deref(),
            Some("products/mate-calabaza")
        );
        assert_eq!(
            item(CART_ITEMS, "a/b c").ok().as_deref(),
            Some("cart/items/a%2Fb%20c")
        );
        assert_eq!(
            item(CART_ITEMS, "v1.2").ok().as_deref(),
            Some("cart/items/v1.2")
        );
        assert_eq!(
            item(CART_ITEMS, "%2e%2e").ok().as_deref(),
            Some("cart/items/%252e%252e")
        );
    }

    #[test]
    fn test_item_rejects_dot_segments() {
        for id in [".", "..", "", "  "] {
            assert!(
                matches!(item(CART_ITEMS, id), Err(BackendError::NotFound(_))),
                "{id:?}"
            );
        }
    }

    #[test]
    fn test_paths_are_relative() {
        for path in [PRODUCTS, CART_ITEMS, CHECKOUT, SHIPPING_OPTIONS, BANNERS] {
            assert!(!path.starts_with('/'));
        }
    }
}
