//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page
//!
//! # Catalog
//! GET  /products                 - Product listing (?page, ?q, ?category, ?sort)
//! GET  /products/{slug}          - Product detail
//! GET  /categories               - Category listing
//! GET  /categories/{slug}        - Category detail
//!
//! # Cart (POST-redirect-GET)
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add product
//! POST /cart/update              - Set line quantity
//! POST /cart/remove              - Remove line
//! POST /cart/clear               - Empty cart
//!
//! # Checkout (requires auth)
//! GET  /checkout                 - Redirect to the first incomplete step
//! GET  /checkout/shipping        - Address form and shipping options
//! POST /checkout/shipping        - Submit address
//! POST /checkout/shipping/option - Choose shipping option
//! GET  /checkout/payment         - Payment methods
//! POST /checkout/payment         - Choose payment method
//! GET  /checkout/review          - Order summary
//! POST /checkout/place-order     - Place the order
//! GET  /checkout/confirmation/{id}
//! GET  /checkout/return          - Payment provider back URL
//!
//! # Auth
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action
//! POST /auth/logout              - Logout action
//!
//! # Account (requires auth)
//! GET  /account                  - Profile and recent orders
//! GET  /account/orders           - Order history
//! GET  /account/orders/{id}      - Order detail
//! GET  /account/addresses        - Address book
//! GET  /account/addresses/new    - New address form
//! POST /account/addresses        - Create address
//! GET  /account/addresses/{id}/edit
//! POST /account/addresses/{id}   - Update address
//! POST /account/addresses/{id}/delete
//!
//! # Marketing
//! POST /newsletter               - Subscribe
//! GET  /contact                  - Contact form
//! POST /contact                  - Send message
//! GET  /pages/{slug}             - About, FAQ, terms, privacy
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod contact;
pub mod forms;
pub mod home;
pub mod newsletter;
pub mod pages;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use url::form_urlencoded;

use crate::backend::ProductPage;
use crate::middleware::{auth_rate_limiter, mutation_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Only the POST handlers are rate limited; both share one limiter.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();

    Router::new()
        .route(
            "/login",
            post(auth::login)
                .layer(limiter.clone())
                .get(auth::login_page),
        )
        .route(
            "/register",
            post(auth::register)
                .layer(limiter)
                .get(auth::register_page),
        )
        .route("/logout", post(auth::logout))
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{slug}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let limiter = mutation_rate_limiter();

    Router::new().route("/", get(cart::show)).merge(
        Router::new()
            .route("/add", post(cart::add))
            .route("/update", post(cart::update))
            .route("/remove", post(cart::remove))
            .route("/clear", post(cart::clear))
            .layer(limiter),
    )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let limiter = mutation_rate_limiter();

    Router::new()
        .route("/", get(checkout::start))
        .route(
            "/shipping",
            post(checkout::submit_shipping)
                .layer(limiter.clone())
                .get(checkout::shipping),
        )
        .route(
            "/shipping/option",
            post(checkout::choose_shipping).layer(limiter.clone()),
        )
        .route(
            "/payment",
            post(checkout::choose_payment)
                .layer(limiter.clone())
                .get(checkout::payment),
        )
        .route("/review", get(checkout::review))
        .route("/place-order", post(checkout::place_order).layer(limiter))
        .route("/confirmation/{id}", get(checkout::confirmation))
        .route("/return", get(checkout::payment_return))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/new", get(account::new_address))
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/edit", get(account::edit_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Customer
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        // Marketing
        .route("/newsletter", post(newsletter::subscribe))
        .route("/contact", get(contact::show).post(contact::submit))
        .route("/pages/{slug}", get(pages::show))
}

/// Previous/next links for a paginated product listing.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    /// Links for `page`, keeping the listing's other query parameters.
    #[must_use]
    pub fn new(page: &ProductPage, path: &str, params: &[(&str, &str)]) -> Self {
        let href = |number: u32| {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params {
                if !value.is_empty() {
                    query.append_pair(key, value);
                }
            }
            query.append_pair("page", &number.to_string());
            format!("{path}?{}", query.finish())
        };

        Self {
            page: page.page,
            total_pages: page.total_pages(),
            previous: page.has_previous().then(|| href(page.page - 1)),
            next: page.has_next().then(|| href(page.page + 1)),
        }
    }

    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total: u64) -> ProductPage {
        ProductPage {
            items: vec![],
            page,
            per_page: 10,
            total,
        }
    }

    #[test]
    fn test_pagination_links_keep_filters() {
        let pagination = Pagination::new(
            &page(2, 35),
            "/products",
            &[("q", "mate cup"), ("sort", "price_asc"), ("category", "")],
        );
        assert_eq!(pagination.total_pages, 4);
        assert_eq!(
            pagination.previous.as_deref(),
            Some("/products?q=mate+cup&sort=price_asc&page=1")
        );
        assert_eq!(
            pagination.next.as_deref(),
            Some("/products?q=mate+cup&sort=price_asc&page=3")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let pagination = Pagination::new(&page(1, 3), "/categories/yerba", &[]);
        assert!(!pagination.is_paged());
        assert!(pagination.previous.is_none());
        assert!(pagination.next.is_none());
    }
}
