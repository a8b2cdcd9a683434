//! Payload types for the shop REST API.
//!
//! These mirror the backend's JSON. Everything that may be cached in the
//! session (cart, shipping options, payment methods) derives both
//! `Serialize` and `Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{
    AddressId, CartId, CartItemId, CategoryId, Email, Money, OrderId, OrderStatus,
    PaymentMethodId, PaymentStatus, ProductId, ShippingAddress, ShippingOptionId, UserId,
};

// =============================================================================
// Catalog
// =============================================================================

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub category_slug: Option<String>,
    #[serde(default = "default_true")]
    pub available: bool,
    /// Units in stock; `None` when the backend does not track stock.
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub featured: bool,
}

/// Stock at or below which the product page shows a "few left" notice.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

const fn default_true() -> bool {
    true
}

impl Product {
    /// First image, used on cards and in the cart.
    #[must_use]
    pub fn featured_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }

    /// Whether a higher compare-at price is shown struck through.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|compare| {
            compare.currency_code == self.price.currency_code && compare.amount > self.price.amount
        })
    }

    /// Whether the product can be added to the cart at all.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.available && self.stock != Some(0)
    }

    /// Units left when few enough to be worth showing.
    #[must_use]
    pub fn low_stock(&self) -> Option<u32> {
        self.stock.filter(|stock| (1..=LOW_STOCK_THRESHOLD).contains(stock))
    }
}

/// Sort orders accepted by the product listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Parse the `sort` query parameter; unknown values fall back to `None`.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "newest" => Some(Self::Newest),
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::Name => "Name",
        }
    }

    pub const ALL: [Self; 4] = [Self::Newest, Self::PriceAsc, Self::PriceDesc, Self::Name];
}

/// Filters for the product listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub page: u32,
    pub per_page: u32,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
    pub featured: bool,
}

impl ProductQuery {
    /// First page with the given size and no filters.
    #[must_use]
    pub const fn first_page(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            category: None,
            search: None,
            sort: None,
            featured: false,
        }
    }

    /// Query string pairs in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("q", search.clone()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_param().to_string()));
        }
        if self.featured {
            pairs.push(("featured", "true".to_string()));
        }
        pairs
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl ProductPage {
    /// Number of pages, at least 1.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_count: Option<u32>,
}

/// Marketing banner for the home page hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    #[serde(default)]
    pub stock: Option<u32>,
}

/// The server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    #[serde(default)]
    pub item_count: u32,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCartItemRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeCartRequest<'a> {
    pub guest_cart_id: &'a CartId,
}

// =============================================================================
// Customers
// =============================================================================

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a Email,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a Email,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// An address in the customer's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
}

/// Body for creating or updating a saved address.
#[derive(Debug, Clone, Serialize)]
pub struct AddressRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
    #[serde(flatten)]
    pub address: &'a ShippingAddress,
    pub is_default: bool,
}

// =============================================================================
// Orders
// =============================================================================

/// Order row in the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub number: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total: Money,
    #[serde(default)]
    pub item_count: u32,
}

/// A purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Full order detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

// =============================================================================
// Checkout
// =============================================================================

/// A delivery option quoted for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub carrier: String,
    pub service: String,
    pub cost: Money,
    #[serde(default)]
    pub min_days: Option<u32>,
    #[serde(default)]
    pub max_days: Option<u32>,
}

impl ShippingOption {
    /// `"3-5 business days"`, `"2 business days"` or empty when unknown.
    #[must_use]
    pub fn delivery_estimate(&self) -> String {
        match (self.min_days, self.max_days) {
            (Some(min), Some(max)) if min < max => format!("{min}-{max} business days"),
            (Some(days), _) | (None, Some(days)) => {
                if days == 1 {
                    "1 business day".to_string()
                } else {
                    format!("{days} business days")
                }
            }
            (None, None) => String::new(),
        }
    }
}

/// How a payment method is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Off-site payment; checkout ends with a redirect.
    MercadoPago,
    BankTransfer,
    CashOnDelivery,
    #[serde(other)]
    Other,
}

impl PaymentKind {
    /// Whether placing the order sends the buyer to the provider.
    #[must_use]
    pub const fn redirects(self) -> bool {
        matches!(self, Self::MercadoPago)
    }
}

/// A payment method available for an address and shipping option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    pub kind: PaymentKind,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingOptionsRequest<'a> {
    pub address: &'a ShippingAddress,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodsRequest<'a> {
    pub address: &'a ShippingAddress,
    pub shipping_option_id: &'a ShippingOptionId,
}

/// Final checkout payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: CartId,
    pub shipping_address: ShippingAddress,
    pub shipping_option_id: ShippingOptionId,
    pub payment_method_id: PaymentMethodId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// What the backend did with a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutResult {
    /// Pay off-site, then come back through the return URL.
    Redirect { url: String, order_id: OrderId },
    /// Order placed without an off-site payment step.
    Confirmed { order: Order },
}

// =============================================================================
// Marketing & contact
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NewsletterRequest<'a> {
    pub email: &'a Email,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactRequest<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub message: &'a str,
}
