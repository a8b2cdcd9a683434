//! REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Catalog reads are cached with `moka`.

use std::fmt;
use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use vitrina_core::{
    AddressId, CartId, CartItemId, Email, OrderId, ProductId, ShippingAddress, ShippingOptionId,
};

use super::BackendError;
use super::cache::{CacheKey, CacheValue};
use super::endpoints::{self, API_KEY_HEADER, CART_ID_HEADER, IDEMPOTENCY_KEY_HEADER};
use super::types::{
    AddCartItemRequest, AddressRequest, AuthSession, Banner, Cart, Category, CheckoutRequest,
    CheckoutResult, ContactRequest, LoginRequest, MergeCartRequest, NewsletterRequest, Order,
    OrderSummary, PaymentMethod, PaymentMethodsRequest, Product, ProductPage, ProductQuery,
    RegisterRequest, SavedAddress, ShippingOption, ShippingOptionsRequest, UpdateCartItemRequest,
};
use crate::config::{BackendConfig, api_key_header_value};

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 1000;

/// How many characters of an unparseable body to log.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// Caller
// =============================================================================

/// Who a request is made on behalf of.
#[derive(Clone, Copy, Default)]
pub struct Caller<'a> {
    token: Option<&'a str>,
    cart_id: Option<&'a CartId>,
}

impl<'a> Caller<'a> {
    /// No customer and no cart.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            token: None,
            cart_id: None,
        }
    }

    #[must_use]
    pub const fn new(token: Option<&'a str>, cart_id: Option<&'a CartId>) -> Self {
        Self { token, cart_id }
    }

    /// A logged-in customer.
    #[must_use]
    pub const fn customer(token: &'a str) -> Self {
        Self {
            token: Some(token),
            cart_id: None,
        }
    }
}

impl fmt::Debug for Caller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("token", &self.token.map(|_| "[REDACTED]"))
            .field("cart_id", &self.cart_id)
            .finish()
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the shop REST API.
///
/// Cheap to clone. Catalog responses are cached for the configured TTL.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<HeaderValue>,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the API key is
    /// not a valid header value.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vitrina-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let api_key = match api_key_header_value(config) {
            Some(key) => {
                let mut value = HeaderValue::from_str(key)?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                api_key,
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url, caller: Caller<'_>) -> RequestBuilder {
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(key) = &self.inner.api_key {
            request = request.header(API_KEY_HEADER, key.clone());
        }
        if let Some(token) = caller.token {
            request = request.bearer_auth(token);
        }
        if let Some(cart_id) = caller.cart_id {
            request = request.header(CART_ID_HEADER, cart_id.as_str());
        }
        request
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let error = BackendError::from_status(status.as_u16(), path, &body);
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    path,
                    body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                    "Backend returned server error"
                );
            } else {
                debug!(status = %status, path, "Backend rejected request");
            }
            return Err(error);
        }

        Ok(body)
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, BackendError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        caller: Caller<'_>,
    ) -> Result<T, BackendError> {
        self.get_with(Method::GET, path, caller).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        caller: Caller<'_>,
        body: &B,
    ) -> Result<T, BackendError> {
        let request = self.request(method, self.url(path)?, caller).json(body);
        let text = self.send(path, request).await?;
        Self::decode(path, &text)
    }

    /// Send a request whose response body is ignored.
    async fn send_unit(&self, request: RequestBuilder, path: &str) -> Result<(), BackendError> {
        self.send(path, request).await.map(|_| ())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products matching a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.url(endpoints::PRODUCTS)?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        let request = self.request(Method::GET, url, Caller::anonymous());
        let body = self.send(endpoints::PRODUCTS, request).await?;
        let page: ProductPage = Self::decode(endpoints::PRODUCTS, &body)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .get(&endpoints::item(endpoints::PRODUCTS, slug)?, Caller::anonymous())
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> =
            self.get(endpoints::CATEGORIES, Caller::anonymous()).await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Get a category by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the category is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_category(&self, slug: &str) -> Result<Category, BackendError> {
        let cache_key = CacheKey::Category(slug.to_string());
        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let category: Category = self
            .get(
                &endpoints::item(endpoints::CATEGORIES, slug)?,
                Caller::anonymous(),
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Category(Box::new(category.clone())))
            .await;

        Ok(category)
    }

    /// Home page banners.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_banners(&self) -> Result<Vec<Banner>, BackendError> {
        if let Some(CacheValue::Banners(banners)) = self.inner.cache.get(&CacheKey::Banners).await
        {
            debug!("Cache hit for banners");
            return Ok(banners);
        }

        let banners: Vec<Banner> = self.get(endpoints::BANNERS, Caller::anonymous()).await?;

        self.inner
            .cache
            .insert(CacheKey::Banners, CacheValue::Banners(banners.clone()))
            .await;

        Ok(banners)
    }

    /// Uncached request used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let request = self.request(
            Method::GET,
            self.url(endpoints::CATEGORIES)?,
            Caller::anonymous(),
        );
        self.send_unit(request, endpoints::CATEGORIES).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, caller: Caller<'_>) -> Result<Cart, BackendError> {
        self.get(endpoints::CART, caller).await
    }

    /// Add a product to the cart, creating the cart when the caller has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn add_cart_item(
        &self,
        caller: Caller<'_>,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let body = AddCartItemRequest {
            product_id,
            quantity,
        };
        self.send_json(Method::POST, endpoints::CART_ITEMS, caller, &body)
            .await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id, quantity))]
    pub async fn update_cart_item(
        &self,
        caller: Caller<'_>,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let path = endpoints::item(endpoints::CART_ITEMS, item_id.as_str())?;
        self.send_json(
            Method::PATCH,
            &path,
            caller,
            &UpdateCartItemRequest { quantity },
        )
        .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_cart_item(
        &self,
        caller: Caller<'_>,
        item_id: &CartItemId,
    ) -> Result<Cart, BackendError> {
        let path = endpoints::item(endpoints::CART_ITEMS, item_id.as_str())?;
        self.get_with(Method::DELETE, &path, caller).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, caller: Caller<'_>) -> Result<(), BackendError> {
        let request = self.request(Method::DELETE, self.url(endpoints::CART)?, caller);
        self.send_unit(request, endpoints::CART).await
    }

    /// Merge a guest cart into the logged-in customer's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(guest_cart_id = %guest_cart_id))]
    pub async fn merge_cart(
        &self,
        caller: Caller<'_>,
        guest_cart_id: &CartId,
    ) -> Result<Cart, BackendError> {
        self.send_json(
            Method::POST,
            endpoints::CART_MERGE,
            caller,
            &MergeCartRequest { guest_cart_id },
        )
        .await
    }

    /// Bodyless request with a JSON response.
    async fn get_with<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        caller: Caller<'_>,
    ) -> Result<T, BackendError> {
        let request = self.request(method, self.url(path)?, caller);
        let body = self.send(path, request).await?;
        Self::decode(path, &body)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for bad credentials, or an error if the API
    /// request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<AuthSession, BackendError> {
        self.send_json(
            Method::POST,
            endpoints::AUTH_LOGIN,
            Caller::anonymous(),
            &LoginRequest { email, password },
        )
        .await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend rejects the registration (e.g. the
    /// email is taken), or an error if the API request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &Email,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AuthSession, BackendError> {
        self.send_json(
            Method::POST,
            endpoints::AUTH_REGISTER,
            Caller::anonymous(),
            &RegisterRequest {
                email,
                password,
                first_name,
                last_name,
            },
        )
        .await
    }

    /// Revoke the caller's token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self, caller: Caller<'_>) -> Result<(), BackendError> {
        let request = self.request(Method::POST, self.url(endpoints::AUTH_LOGOUT)?, caller);
        self.send_unit(request, endpoints::AUTH_LOGOUT).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, caller: Caller<'_>) -> Result<Vec<OrderSummary>, BackendError> {
        self.get(endpoints::ORDERS, caller).await
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist or belongs to someone
    /// else, or an error if the API request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        caller: Caller<'_>,
        order_id: &OrderId,
    ) -> Result<Order, BackendError> {
        self.get(&endpoints::item(endpoints::ORDERS, order_id.as_str())?, caller)
            .await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// The customer's address book.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(
        &self,
        caller: Caller<'_>,
    ) -> Result<Vec<SavedAddress>, BackendError> {
        self.get(endpoints::ADDRESSES, caller).await
    }

    /// A single saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not found or the API request fails.
    #[instrument(skip(self), fields(address_id = %address_id))]
    pub async fn get_address(
        &self,
        caller: Caller<'_>,
        address_id: &AddressId,
    ) -> Result<SavedAddress, BackendError> {
        self.get(
            &endpoints::item(endpoints::ADDRESSES, address_id.as_str())?,
            caller,
        )
        .await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the address is rejected.
    #[instrument(skip(self, address))]
    pub async fn create_address(
        &self,
        caller: Caller<'_>,
        label: Option<&str>,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<SavedAddress, BackendError> {
        let body = AddressRequest {
            label,
            address,
            is_default,
        };
        self.send_json(Method::POST, endpoints::ADDRESSES, caller, &body)
            .await
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the address is rejected.
    #[instrument(skip(self, address), fields(address_id = %address_id))]
    pub async fn update_address(
        &self,
        caller: Caller<'_>,
        address_id: &AddressId,
        label: Option<&str>,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<SavedAddress, BackendError> {
        let path = endpoints::item(endpoints::ADDRESSES, address_id.as_str())?;
        let body = AddressRequest {
            label,
            address,
            is_default,
        };
        self.send_json(Method::PUT, &path, caller, &body).await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(address_id = %address_id))]
    pub async fn delete_address(
        &self,
        caller: Caller<'_>,
        address_id: &AddressId,
    ) -> Result<(), BackendError> {
        let path = endpoints::item(endpoints::ADDRESSES, address_id.as_str())?;
        let request = self.request(Method::DELETE, self.url(&path)?, caller);
        self.send_unit(request, &path).await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Delivery options for an address.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend cannot ship to the address, or an
    /// error if the API request fails.
    #[instrument(skip(self, address), fields(postal_code = %address.postal_code))]
    pub async fn shipping_options(
        &self,
        caller: Caller<'_>,
        address: &ShippingAddress,
    ) -> Result<Vec<ShippingOption>, BackendError> {
        self.send_json(
            Method::POST,
            endpoints::SHIPPING_OPTIONS,
            caller,
            &ShippingOptionsRequest { address },
        )
        .await
    }

    /// Payment methods for an address and shipping option.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, address), fields(shipping_option_id = %shipping_option_id))]
    pub async fn payment_methods(
        &self,
        caller: Caller<'_>,
        address: &ShippingAddress,
        shipping_option_id: &ShippingOptionId,
    ) -> Result<Vec<PaymentMethod>, BackendError> {
        self.send_json(
            Method::POST,
            endpoints::PAYMENT_METHODS,
            caller,
            &PaymentMethodsRequest {
                address,
                shipping_option_id,
            },
        )
        .await
    }

    /// Submit the order.
    ///
    /// The idempotency key makes resubmission after a timeout safe.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend rejects the order (e.g. stock
    /// changed), or an error if the API request fails.
    #[instrument(skip(self, request), fields(cart_id = %request.cart_id, idempotency_key = %idempotency_key))]
    pub async fn place_order(
        &self,
        caller: Caller<'_>,
        request: &CheckoutRequest,
        idempotency_key: Uuid,
    ) -> Result<CheckoutResult, BackendError> {
        let http = self
            .request(Method::POST, self.url(endpoints::CHECKOUT)?, caller)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(request);
        let body = self.send(endpoints::CHECKOUT, http).await?;
        Self::decode(endpoints::CHECKOUT, &body)
    }

    // =========================================================================
    // Marketing & contact
    // =========================================================================

    /// Subscribe an email to the newsletter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn subscribe_newsletter(&self, email: &Email) -> Result<(), BackendError> {
        let request = self
            .request(
                Method::POST,
                self.url(endpoints::NEWSLETTER)?,
                Caller::anonymous(),
            )
            .json(&NewsletterRequest { email });
        self.send_unit(request, endpoints::NEWSLETTER).await
    }

    /// Forward a contact form message.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, message), fields(email = %email))]
    pub async fn send_contact(
        &self,
        name: &str,
        email: &Email,
        message: &str,
    ) -> Result<(), BackendError> {
        let request = self
            .request(
                Method::POST,
                self.url(endpoints::CONTACT)?,
                Caller::anonymous(),
            )
            .json(&ContactRequest {
                name,
                email,
                message,
            });
        self.send_unit(request, endpoints::CONTACT).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::parse_base_url;

    fn config(base: &str) -> BackendConfig {
        BackendConfig {
            base_url: parse_base_url(base).unwrap_or_else(|e| panic!("{e}")),
            api_key: None,
            timeout: Duration::from_secs(5),
            catalog_cache_ttl: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = BackendClient::new(&config("https://api.example.com/v1"))
            .unwrap_or_else(|e| panic!("{e}"));
        let url = client
            .url(
                &endpoints::item(endpoints::PRODUCTS, "mate")
                    .unwrap_or_else(|e| panic!("{e}")),
            )
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(url.as_str(), "https://api.example.com/v1/products/mate");
    }

    #[test]
    fn test_caller_debug_redacts_token() {
        let cart_id = CartId::new("c1");
        let caller = Caller::new(Some("secret-token"), Some(&cart_id));
        let debug = format!("{caller:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("c1"));
    }
}
