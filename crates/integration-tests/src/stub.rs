//! In-memory stand-in for the shop REST API.
//!
//! Implements just enough of the backend contract for the storefront's
//! flows: a fixed catalog, guest and customer carts, token auth, addresses,
//! orders and both checkout outcomes. Knobs on [`StubShop`] let a test
//! revoke tokens, reject or redirect checkouts, and simulate an outage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Email of the customer every stub shop starts with.
pub const CUSTOMER_EMAIL: &str = "ana@example.com";
/// Password of [`CUSTOMER_EMAIL`].
pub const CUSTOMER_PASSWORD: &str = "mate1234";

const CART_ID_HEADER: &str = "x-cart-id";
const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

type Reply = Response;

// =============================================================================
// Data
// =============================================================================

struct StubProduct {
    id: &'static str,
    slug: &'static str,
    name: &'static str,
    price: i64,
    compare_at: Option<i64>,
    category: &'static str,
    stock: u32,
    featured: bool,
}

const PRODUCTS: &[StubProduct] = &[
    StubProduct {
        id: "p-yerba",
        slug: "yerba-mate-1kg",
        name: "Yerba mate 1kg",
        price: 4500,
        compare_at: None,
        category: "yerba",
        stock: 40,
        featured: true,
    },
    StubProduct {
        id: "p-calabaza",
        slug: "mate-calabaza",
        name: "Mate de calabaza",
        price: 12000,
        compare_at: Some(15000),
        category: "accesorios",
        stock: 3,
        featured: true,
    },
    StubProduct {
        id: "p-bombilla",
        slug: "bombilla-alpaca",
        name: "Bombilla de alpaca",
        price: 6800,
        compare_at: None,
        category: "accesorios",
        stock: 0,
        featured: false,
    },
    StubProduct {
        id: "p-termo",
        slug: "termo-acero",
        name: "Termo de acero 1L",
        price: 32000,
        compare_at: None,
        category: "accesorios",
        stock: 10,
        featured: false,
    },
];

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("c-yerba", "yerba", "Yerba mate"),
    ("c-accesorios", "accesorios", "Accesorios"),
];

impl StubProduct {
    fn find(key: &str) -> Option<&'static Self> {
        PRODUCTS.iter().find(|p| p.slug == key || p.id == key)
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "slug": self.slug,
            "name": self.name,
            "description": format!("{} from the stub shop.", self.name),
            "price": money(Decimal::from(self.price)),
            "compare_at_price": self.compare_at.map(|amount| money(Decimal::from(amount))),
            "images": [],
            "category_slug": self.category,
            "available": true,
            "stock": self.stock,
            "featured": self.featured,
        })
    }
}

struct StubUser {
    id: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

impl StubUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
        })
    }
}

#[derive(Default)]
struct StubCart {
    lines: Vec<StubLine>,
}

struct StubLine {
    id: String,
    product: &'static StubProduct,
    quantity: u32,
}

struct StubOrder {
    user_id: String,
    body: Value,
}

#[derive(Default)]
struct ShopData {
    next_id: u64,
    users: Vec<StubUser>,
    tokens: HashMap<String, String>,
    carts: HashMap<String, StubCart>,
    customer_carts: HashMap<String, String>,
    addresses: HashMap<String, Vec<Value>>,
    orders: Vec<StubOrder>,
    checkouts: HashMap<String, Value>,
    checkout_keys: Vec<String>,
    newsletter: Vec<String>,
    contact: Vec<Value>,
    payment_redirect: Option<String>,
    reject_checkout: Option<String>,
    fail_checkout: bool,
    outage: bool,
}

impl ShopData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// The customer behind the bearer token, if one was sent.
    fn customer(&self, headers: &HeaderMap) -> Result<Option<String>, Reply> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();
        self.tokens
            .get(token)
            .cloned()
            .map(Some)
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }

    fn require_customer(&self, headers: &HeaderMap) -> Result<String, Reply> {
        self.customer(headers)?
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Authentication required"))
    }

    fn new_cart(&mut self) -> String {
        let id = self.next_id("cart");
        self.carts.insert(id.clone(), StubCart::default());
        id
    }

    fn customer_cart(&mut self, user_id: &str) -> String {
        if let Some(id) = self.customer_carts.get(user_id) {
            return id.clone();
        }
        let id = self.new_cart();
        self.customer_carts.insert(user_id.to_string(), id.clone());
        id
    }

    /// Resolve the caller's cart, creating one when `create` is set.
    fn cart_id(&mut self, headers: &HeaderMap, create: bool) -> Result<Option<String>, Reply> {
        if let Some(user_id) = self.customer(headers)? {
            return Ok(Some(self.customer_cart(&user_id)));
        }
        let guest = headers
            .get(CART_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| self.carts.contains_key(*id))
            .map(String::from);
        Ok(match guest {
            Some(id) => Some(id),
            None if create => Some(self.new_cart()),
            None => None,
        })
    }

    fn cart_json(&self, id: &str) -> Value {
        let empty = StubCart::default();
        let cart = self.carts.get(id).unwrap_or(&empty);
        let items: Vec<Value> = cart
            .lines
            .iter()
            .map(|line| {
                let unit = Decimal::from(line.product.price);
                json!({
                    "id": line.id,
                    "product_id": line.product.id,
                    "slug": line.product.slug,
                    "name": line.product.name,
                    "unit_price": money(unit),
                    "quantity": line.quantity,
                    "line_total": money(unit * Decimal::from(line.quantity)),
                    "stock": line.product.stock,
                })
            })
            .collect();
        json!({
            "id": id,
            "items": items,
            "subtotal": money(cart_subtotal(cart)),
            "item_count": cart.lines.iter().map(|l| l.quantity).sum::<u32>(),
        })
    }

    fn add_line(
        &mut self,
        cart_id: &str,
        product: &'static StubProduct,
        quantity: u32,
    ) -> Result<(), Reply> {
        let line_id = self.next_id("line");
        let cart = self.carts.entry(cart_id.to_string()).or_default();
        let existing = cart
            .lines
            .iter()
            .find(|l| l.product.id == product.id)
            .map_or(0, |l| l.quantity);
        if existing + quantity > product.stock {
            return Err(error(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("Only {} left in stock.", product.stock),
            ));
        }
        match cart.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(StubLine {
                id: line_id,
                product,
                quantity,
            }),
        }
        Ok(())
    }
}

fn cart_subtotal(cart: &StubCart) -> Decimal {
    cart.lines
        .iter()
        .map(|l| Decimal::from(l.product.price) * Decimal::from(l.quantity))
        .sum()
}

fn money(amount: Decimal) -> Value {
    json!({ "amount": amount.to_string(), "currency_code": "ARS" })
}

fn error(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "message": message }))).into_response()
}

fn ok(body: Value) -> Reply {
    Json(body).into_response()
}

fn no_content() -> Reply {
    StatusCode::NO_CONTENT.into_response()
}

fn shipping_cost(option_id: &str) -> Option<Decimal> {
    match option_id {
        "standard" => Some(Decimal::from(2500)),
        "express" => Some(Decimal::from(5200)),
        _ => None,
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Shared handle to a running stub shop.
#[derive(Clone)]
pub struct StubShop {
    data: Arc<Mutex<ShopData>>,
}

impl Default for StubShop {
    fn default() -> Self {
        Self::new()
    }
}

impl StubShop {
    /// A shop with the fixed catalog and one registered customer.
    #[must_use]
    pub fn new() -> Self {
        let data = ShopData {
            users: vec![StubUser {
                id: "u-ana".to_string(),
                email: CUSTOMER_EMAIL.to_string(),
                password: CUSTOMER_PASSWORD.to_string(),
                first_name: "Ana".to_string(),
                last_name: "Pérez".to_string(),
            }],
            ..ShopData::default()
        };
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ShopData> {
        self.data.lock().expect("stub shop state poisoned")
    }

    /// Serve the API on an ephemeral port and return its base URL.
    pub async fn spawn(&self) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub shop");
        let addr = listener.local_addr().expect("Stub shop has no address");
        let router = self.router();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Stub shop stopped");
        });
        Url::parse(&format!("http://{addr}/api/")).expect("Stub shop URL is valid")
    }

    /// Routes under `/api`.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/products", get(list_products))
            .route("/products/{slug}", get(get_product))
            .route("/categories", get(list_categories))
            .route("/categories/{slug}", get(get_category))
            .route("/marketing/banners", get(list_banners))
            .route("/cart", get(get_cart).delete(clear_cart))
            .route("/cart/items", post(add_cart_item))
            .route(
                "/cart/items/{id}",
                patch(update_cart_item).delete(remove_cart_item),
            )
            .route("/cart/merge", post(merge_cart))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/logout", post(logout))
            .route("/orders", get(list_orders))
            .route("/orders/{id}", get(get_order))
            .route("/addresses", get(list_addresses).post(create_address))
            .route(
                "/addresses/{id}",
                get(get_address).put(update_address).delete(delete_address),
            )
            .route("/checkout/shipping-options", post(shipping_options))
            .route("/checkout/payment-methods", post(payment_methods))
            .route("/checkout", post(place_order))
            .route("/newsletter", post(subscribe))
            .route("/contact", post(contact))
            .layer(middleware::from_fn_with_state(self.clone(), outage))
            .with_state(self.clone());

        Router::new().nest("/api", api)
    }

    /// Reject every token issued so far, as if they expired.
    pub fn revoke_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Answer every request with 503 while `down` is set.
    pub fn set_outage(&self, down: bool) {
        self.lock().outage = down;
    }

    /// Provider URL returned for Mercado Pago orders.
    pub fn set_payment_redirect(&self, url: &str) {
        self.lock().payment_redirect = Some(url.to_string());
    }

    /// Reject the next checkout with a 422 carrying `message`.
    pub fn reject_next_checkout(&self, message: &str) {
        self.lock().reject_checkout = Some(message.to_string());
    }

    /// Record the next checkout's key, then fail it with a 500 before any
    /// order exists.
    pub fn fail_next_checkout(&self) {
        self.lock().fail_checkout = true;
    }

    /// Idempotency keys of every checkout request, in arrival order.
    #[must_use]
    pub fn checkout_keys(&self) -> Vec<String> {
        self.lock().checkout_keys.clone()
    }

    /// Number of orders placed by the customer with `email`.
    #[must_use]
    pub fn order_count(&self, email: &str) -> usize {
        let data = self.lock();
        let Some(user) = data.users.iter().find(|u| u.email == email) else {
            return 0;
        };
        data.orders.iter().filter(|o| o.user_id == user.id).count()
    }

    /// Emails subscribed to the newsletter.
    #[must_use]
    pub fn newsletter_emails(&self) -> Vec<String> {
        self.lock().newsletter.clone()
    }

    /// Contact messages received.
    #[must_use]
    pub fn contact_messages(&self) -> Vec<Value> {
        self.lock().contact.clone()
    }

    /// Saved addresses of the customer with `email`.
    #[must_use]
    pub fn addresses_of(&self, email: &str) -> Vec<Value> {
        let data = self.lock();
        data.users
            .iter()
            .find(|u| u.email == email)
            .and_then(|u| data.addresses.get(&u.id))
            .cloned()
            .unwrap_or_default()
    }
}

async fn outage(State(shop): State<StubShop>, request: Request, next: Next) -> Reply {
    if shop.lock().outage {
        return error(StatusCode::SERVICE_UNAVAILABLE, "maintenance");
    }
    next.run(request).await
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(Query(params): Query<HashMap<String, String>>) -> Reply {
    let param = |key: &str| params.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let page: usize = param("page").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
    let per_page: usize = param("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(12)
        .max(1);
    let search = param("q").map(str::to_lowercase);

    let mut matches: Vec<&StubProduct> = PRODUCTS
        .iter()
        .filter(|p| param("category").is_none_or(|c| p.category == c))
        .filter(|p| param("featured") != Some("true") || p.featured)
        .filter(|p| {
            search
                .as_deref()
                .is_none_or(|q| p.name.to_lowercase().contains(q))
        })
        .collect();
    match param("sort") {
        Some("price_asc") => matches.sort_by_key(|p| p.price),
        Some("price_desc") => matches.sort_by_key(|p| std::cmp::Reverse(p.price)),
        Some("name") => matches.sort_by_key(|p| p.name),
        _ => {}
    }

    let items: Vec<Value> = matches
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|p| p.to_json())
        .collect();
    ok(json!({
        "items": items,
        "page": page,
        "per_page": per_page,
        "total": matches.len(),
    }))
}

async fn get_product(Path(slug): Path<String>) -> Reply {
    StubProduct::find(&slug).map_or_else(
        || error(StatusCode::NOT_FOUND, "Product not found"),
        |p| ok(p.to_json()),
    )
}

fn category_json(&(id, slug, name): &(&str, &str, &str)) -> Value {
    let count = PRODUCTS.iter().filter(|p| p.category == slug).count();
    json!({ "id": id, "slug": slug, "name": name, "product_count": count })
}

async fn list_categories() -> Reply {
    ok(Value::Array(CATEGORIES.iter().map(category_json).collect()))
}

async fn get_category(Path(slug): Path<String>) -> Reply {
    CATEGORIES.iter().find(|c| c.1 == slug).map_or_else(
        || error(StatusCode::NOT_FOUND, "Category not found"),
        |c| ok(category_json(c)),
    )
}

async fn list_banners() -> Reply {
    ok(json!([{
        "id": "b-otono",
        "title": "Otoño matero",
        "subtitle": "Yerbas nuevas todas las semanas",
        "image_url": "/static/images/banner.jpg",
        "link_url": "/categories/yerba",
        "cta_label": "Ver yerbas",
    }]))
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(State(shop): State<StubShop>, headers: HeaderMap) -> Reply {
    let mut data = shop.lock();
    match data.cart_id(&headers, false) {
        Ok(Some(id)) => ok(data.cart_json(&id)),
        Ok(None) => error(StatusCode::NOT_FOUND, "Cart not found"),
        Err(reply) => reply,
    }
}

async fn clear_cart(State(shop): State<StubShop>, headers: HeaderMap) -> Reply {
    let mut data = shop.lock();
    match data.cart_id(&headers, false) {
        Ok(Some(id)) => {
            data.carts.insert(id, StubCart::default());
            no_content()
        }
        Ok(None) => error(StatusCode::NOT_FOUND, "Cart not found"),
        Err(reply) => reply,
    }
}

async fn add_cart_item(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let cart_id = match data.cart_id(&headers, true) {
        Ok(Some(id)) => id,
        Ok(None) => return error(StatusCode::NOT_FOUND, "Cart not found"),
        Err(reply) => return reply,
    };
    let Some(product) = body["product_id"].as_str().and_then(StubProduct::find) else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    let quantity = body["quantity"]
        .as_u64()
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    match data.add_line(&cart_id, product, quantity) {
        Ok(()) => ok(data.cart_json(&cart_id)),
        Err(reply) => reply,
    }
}

async fn update_cart_item(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let cart_id = match data.cart_id(&headers, false) {
        Ok(Some(id)) => id,
        Ok(None) => return error(StatusCode::NOT_FOUND, "Cart not found"),
        Err(reply) => return reply,
    };
    let quantity = body["quantity"]
        .as_u64()
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(0);

    let Some(line) = data
        .carts
        .get_mut(&cart_id)
        .and_then(|c| c.lines.iter_mut().find(|l| l.id == item_id))
    else {
        return error(StatusCode::NOT_FOUND, "Item not found");
    };
    if quantity > line.product.stock {
        let message = format!("Only {} left in stock.", line.product.stock);
        return error(StatusCode::UNPROCESSABLE_ENTITY, &message);
    }
    line.quantity = quantity;
    ok(data.cart_json(&cart_id))
}

async fn remove_cart_item(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Reply {
    let mut data = shop.lock();
    let cart_id = match data.cart_id(&headers, false) {
        Ok(Some(id)) => id,
        Ok(None) => return error(StatusCode::NOT_FOUND, "Cart not found"),
        Err(reply) => return reply,
    };
    if let Some(cart) = data.carts.get_mut(&cart_id) {
        cart.lines.retain(|l| l.id != item_id);
    }
    ok(data.cart_json(&cart_id))
}

async fn merge_cart(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let target = data.customer_cart(&user_id);
    let guest = body["guest_cart_id"]
        .as_str()
        .filter(|id| *id != target)
        .and_then(|id| data.carts.remove(id));

    for line in guest.map(|c| c.lines).unwrap_or_default() {
        // Lines over the stock limit are dropped, as the real backend does
        let _ = data.add_line(&target, line.product, line.quantity);
    }
    ok(data.cart_json(&target))
}

// =============================================================================
// Auth
// =============================================================================

async fn login(State(shop): State<StubShop>, Json(body): Json<Value>) -> Reply {
    let mut data = shop.lock();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let Some(user) = data
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    let (user_id, user_json) = (user.id.clone(), user.to_json());

    let token = data.next_id("tok");
    data.tokens.insert(token.clone(), user_id);
    ok(json!({ "token": token, "user": user_json }))
}

async fn register(State(shop): State<StubShop>, Json(body): Json<Value>) -> Reply {
    let mut data = shop.lock();
    let field = |key: &str| body[key].as_str().unwrap_or_default().to_string();
    let email = field("email");

    if data.users.iter().any(|u| u.email == email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "That email is already registered.",
                "errors": { "email": ["is already registered"] },
            })),
        )
            .into_response();
    }

    let user = StubUser {
        id: data.next_id("u"),
        email,
        password: field("password"),
        first_name: field("first_name"),
        last_name: field("last_name"),
    };
    let user_json = user.to_json();
    let token = data.next_id("tok");
    data.tokens.insert(token.clone(), user.id.clone());
    data.users.push(user);

    (
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user_json })),
    )
        .into_response()
}

async fn logout(State(shop): State<StubShop>, headers: HeaderMap) -> Reply {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from);
    if let Some(token) = token {
        shop.lock().tokens.remove(&token);
    }
    no_content()
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(State(shop): State<StubShop>, headers: HeaderMap) -> Reply {
    let data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let summaries: Vec<Value> = data
        .orders
        .iter()
        .rev()
        .filter(|o| o.user_id == user_id)
        .map(|o| {
            let body = &o.body;
            let item_count: u64 = body["items"]
                .as_array()
                .map(|items| items.iter().filter_map(|i| i["quantity"].as_u64()).sum())
                .unwrap_or_default();
            json!({
                "id": body["id"],
                "number": body["number"],
                "status": body["status"],
                "created_at": body["created_at"],
                "total": body["total"],
                "item_count": item_count,
            })
        })
        .collect();
    ok(Value::Array(summaries))
}

async fn get_order(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    data.orders
        .iter()
        .find(|o| o.user_id == user_id && o.body["id"] == id.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Order not found"),
            |o| ok(o.body.clone()),
        )
}

// =============================================================================
// Addresses
// =============================================================================

fn address_body(mut body: Value, id: &str) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!(id));
        object
            .entry("is_default")
            .or_insert_with(|| Value::Bool(false));
    }
    body
}

fn store_address(data: &mut ShopData, user_id: &str, address: Value) {
    let book = data.addresses.entry(user_id.to_string()).or_default();
    if address["is_default"] == true {
        for other in book.iter_mut() {
            other["is_default"] = Value::Bool(false);
        }
    }
    match book.iter_mut().find(|a| a["id"] == address["id"]) {
        Some(existing) => *existing = address,
        None => book.push(address),
    }
}

async fn list_addresses(State(shop): State<StubShop>, headers: HeaderMap) -> Reply {
    let data = shop.lock();
    match data.require_customer(&headers) {
        Ok(user_id) => ok(Value::Array(
            data.addresses.get(&user_id).cloned().unwrap_or_default(),
        )),
        Err(reply) => reply,
    }
}

async fn get_address(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    data.addresses
        .get(&user_id)
        .and_then(|book| book.iter().find(|a| a["id"] == id.as_str()))
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Address not found"),
            |a| ok(a.clone()),
        )
}

async fn create_address(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let id = data.next_id("addr");
    let address = address_body(body, &id);
    store_address(&mut data, &user_id, address.clone());
    (StatusCode::CREATED, Json(address)).into_response()
}

async fn update_address(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let known = data
        .addresses
        .get(&user_id)
        .is_some_and(|book| book.iter().any(|a| a["id"] == id.as_str()));
    if !known {
        return error(StatusCode::NOT_FOUND, "Address not found");
    }
    let address = address_body(body, &id);
    store_address(&mut data, &user_id, address.clone());
    ok(address)
}

async fn delete_address(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let book = data.addresses.entry(user_id).or_default();
    let before = book.len();
    book.retain(|a| a["id"] != id.as_str());
    if book.len() == before {
        return error(StatusCode::NOT_FOUND, "Address not found");
    }
    no_content()
}

// =============================================================================
// Checkout
// =============================================================================

async fn shipping_options(Json(body): Json<Value>) -> Reply {
    if body["address"]["postal_code"] == "9999" {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "We don't ship to that postal code yet.",
        );
    }
    ok(json!([
        {
            "id": "standard",
            "carrier": "Correo",
            "service": "Estándar",
            "cost": money(Decimal::from(2500)),
            "min_days": 3,
            "max_days": 6,
        },
        {
            "id": "express",
            "carrier": "Moto",
            "service": "Express",
            "cost": money(Decimal::from(5200)),
            "min_days": 1,
            "max_days": 1,
        },
    ]))
}

async fn payment_methods() -> Reply {
    ok(json!([
        { "id": "mp", "name": "Mercado Pago", "kind": "mercado_pago" },
        {
            "id": "transfer",
            "name": "Bank transfer",
            "kind": "bank_transfer",
            "description": "We email the account details.",
        },
    ]))
}

async fn place_order(
    State(shop): State<StubShop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = shop.lock();
    let user_id = match data.require_customer(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(key) = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
    else {
        return error(StatusCode::BAD_REQUEST, "Idempotency-Key is required");
    };
    data.checkout_keys.push(key.clone());

    if let Some(previous) = data.checkouts.get(&key) {
        return ok(previous.clone());
    }
    if std::mem::take(&mut data.fail_checkout) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Payment service unavailable");
    }
    if let Some(message) = data.reject_checkout.take() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, &message);
    }

    let cart_id = data.customer_cart(&user_id);
    let lines = data
        .carts
        .get(&cart_id)
        .map(|c| &c.lines)
        .filter(|lines| !lines.is_empty());
    let Some(lines) = lines else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Your cart is empty.");
    };
    let option = body["shipping_option_id"].as_str().unwrap_or_default();
    let Some(shipping) = shipping_cost(option) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Unknown shipping option.");
    };

    let items: Vec<Value> = lines
        .iter()
        .map(|line| {
            let unit = Decimal::from(line.product.price);
            json!({
                "product_id": line.product.id,
                "name": line.product.name,
                "quantity": line.quantity,
                "unit_price": money(unit),
                "line_total": money(unit * Decimal::from(line.quantity)),
            })
        })
        .collect();
    let subtotal = data.carts.get(&cart_id).map(cart_subtotal).unwrap_or_default();

    let order_id = data.next_id("ord");
    let redirects = body["payment_method_id"] == "mp";
    let order = json!({
        "id": order_id,
        "number": format!("V{:05}", data.next_id),
        "status": if redirects { "pending_payment" } else { "processing" },
        "created_at": Utc::now().to_rfc3339(),
        "items": items,
        "subtotal": money(subtotal),
        "shipping_cost": money(shipping),
        "total": money(subtotal + shipping),
        "shipping_address": body["shipping_address"],
        "shipping_method": option,
        "payment_method": body["payment_method_id"],
        "payment_status": if redirects { "pending" } else { "approved" },
    });

    data.orders.push(StubOrder {
        user_id,
        body: order.clone(),
    });
    data.carts.insert(cart_id, StubCart::default());

    let result = if redirects {
        let url = data.payment_redirect.clone().unwrap_or_else(|| {
            format!("https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=pref-{order_id}")
        });
        json!({ "type": "redirect", "url": url, "order_id": order_id })
    } else {
        json!({ "type": "confirmed", "order": order })
    };
    data.checkouts.insert(key, result.clone());
    ok(result)
}

// =============================================================================
// Marketing & contact
// =============================================================================

async fn subscribe(State(shop): State<StubShop>, Json(body): Json<Value>) -> Reply {
    let mut data = shop.lock();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if data.newsletter.contains(&email) {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "This email is already subscribed.",
        );
    }
    data.newsletter.push(email);
    no_content()
}

async fn contact(State(shop): State<StubShop>, Json(body): Json<Value>) -> Reply {
    shop.lock().contact.push(body);
    no_content()
}
