//! End-to-end test harness for the Vitrina storefront.
//!
//! Each [`TestApp`] runs the real storefront router on an ephemeral port,
//! wired to its own [`StubShop`]. Tests drive it with a cookie-keeping HTTP
//! client that does not follow redirects, so every 303 can be asserted.
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! let response = app.get("/products").await;
//! assert_eq!(response.status(), 200);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

mod stub;

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};
use tokio::net::TcpListener;
use url::Url;
use vitrina_storefront::{
    app,
    config::{BackendConfig, DEFAULT_PAYMENT_REDIRECT_HOSTS, SentryConfig, StorefrontConfig},
    state::AppState,
};

pub use stub::{CUSTOMER_EMAIL, CUSTOMER_PASSWORD, StubShop};

/// Listing page size used by test apps, small enough to paginate the stub
/// catalog.
pub const PRODUCTS_PER_PAGE: u32 = 2;

/// A complete, valid shipping address as the checkout form posts it.
pub const ADDRESS_FORM: &[(&str, &str)] = &[
    ("saved_address_id", ""),
    ("first_name", "Ana"),
    ("last_name", "Pérez"),
    ("street", "Av. Corrientes"),
    ("number", "1234"),
    ("apartment", "5B"),
    ("city", "CABA"),
    ("state", "Buenos Aires"),
    ("postal_code", "C1043"),
    ("country_code", "AR"),
    ("phone", "1155551234"),
];

/// A running storefront plus the stub shop behind it.
pub struct TestApp {
    pub base_url: String,
    pub shop: StubShop,
    pub client: Client,
}

/// Storefront configuration pointing at a stub shop.
#[must_use]
pub fn test_config(addr: SocketAddr, api: Url) -> StorefrontConfig {
    StorefrontConfig {
        host: addr.ip(),
        port: addr.port(),
        base_url: format!("http://{addr}"),
        store_name: "Vitrina Test".to_string(),
        backend: BackendConfig {
            base_url: api,
            api_key: None,
            timeout: Duration::from_secs(5),
            catalog_cache_ttl: Duration::from_secs(60),
        },
        products_per_page: PRODUCTS_PER_PAGE,
        payment_redirect_hosts: DEFAULT_PAYMENT_REDIRECT_HOSTS
            .iter()
            .map(ToString::to_string)
            .collect(),
        sentry: SentryConfig::default(),
        json_logs: false,
    }
}

/// A browser-like client: keeps cookies, never follows redirects.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

impl TestApp {
    /// Start a storefront backed by a fresh stub shop.
    pub async fn spawn() -> Self {
        Self::spawn_with(StubShop::new()).await
    }

    /// Start a storefront backed by `shop`.
    pub async fn spawn_with(shop: StubShop) -> Self {
        let api = shop.spawn().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");

        let state = AppState::new(test_config(addr, api)).expect("Failed to build app state");
        tokio::spawn(async move {
            app::serve(listener, state, std::future::pending())
                .await
                .expect("Storefront stopped");
        });

        Self {
            base_url: format!("http://{addr}"),
            shop,
            client: browser(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// GET a page that must render, and return its HTML.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.expect("Failed to read body")
    }

    /// Sign in as the stub shop's customer.
    pub async fn login(&self) -> Response {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login");
        response
    }

    /// Add `quantity` of the product with `slug`, expecting the redirect.
    pub async fn add_to_cart(&self, slug: &str, quantity: u32) -> Response {
        let quantity = quantity.to_string();
        let response = self
            .post_form("/cart/add", &[("slug", slug), ("quantity", &quantity)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "add {slug}");
        response
    }

    /// Walk the signed-in customer's cart through every checkout step up to
    /// the review page, paying with `payment_method_id`.
    pub async fn checkout_to_review(&self, payment_method_id: &str) {
        let response = self.post_form("/checkout/shipping", ADDRESS_FORM).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "shipping");
        assert_eq!(location(&response), "/checkout/shipping#shipping-options");

        let response = self
            .post_form(
                "/checkout/shipping/option",
                &[("shipping_option_id", "standard")],
            )
            .await;
        assert_eq!(location(&response), "/checkout/payment");

        let response = self
            .post_form(
                "/checkout/payment",
                &[("payment_method_id", payment_method_id), ("notes", "Ring twice")],
            )
            .await;
        assert_eq!(location(&response), "/checkout/review");
    }

    /// Place a bank transfer order for the cart and return the
    /// confirmation path.
    pub async fn place_transfer_order(&self) -> String {
        self.checkout_to_review("transfer").await;
        let response = self.post_form("/checkout/place-order", &[]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "place order");
        location(&response)
    }
}

/// The value of the first `data-item-id` attribute on the cart page.
#[must_use]
pub fn first_cart_item_id(html: &str) -> Option<String> {
    let start = html.find("data-item-id=\"")? + "data-item-id=\"".len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(String::from)
}
