//! Session-mirrored cart with optimistic updates.
//!
//! The backend owns the cart. The session keeps a [`CartMirror`] so pages can
//! render the cart badge without a round trip, and so a mutation shows up
//! immediately even when the backend is slow or failing.
//!
//! A mutation is applied to the mirror first, then sent to the backend:
//!
//! - success: the mirror is replaced by the backend's cart
//! - failure: the cart is refetched; if that fails too, the pre-mutation
//!   snapshot is restored

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::validation::{MAX_LINE_QUANTITY, validate_quantity};
use vitrina_core::{CartId, CartItemId, CurrencyCode, Money, ProductId};

use crate::backend::{BackendClient, BackendError, Caller, Cart, CartItem, Product};
use crate::error::{AppError, add_breadcrumb};
use crate::models::{CurrentCustomer, session_keys};

/// Prefix for lines that exist only in the mirror.
pub const PENDING_PREFIX: &str = "pending:";

// =============================================================================
// CartMirror
// =============================================================================

/// Session copy of the backend cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMirror {
    /// Backend cart id; `None` until the first item is added.
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub item_count: u32,
}

impl Default for CartMirror {
    fn default() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
            subtotal: Money::zero(CurrencyCode::default()),
            item_count: 0,
        }
    }
}

/// A change to the cart.
#[derive(Debug, Clone)]
pub enum CartOp {
    Add { product: Box<Product>, quantity: u32 },
    /// `0` removes the line.
    SetQuantity { item_id: CartItemId, quantity: u32 },
    Remove { item_id: CartItemId },
    Clear,
}

impl CartOp {
    const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::SetQuantity { .. } => "set_quantity",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }
}

/// Most units of a product one line may hold.
fn line_cap(stock: Option<u32>) -> u32 {
    stock.map_or(MAX_LINE_QUANTITY, |stock| stock.min(MAX_LINE_QUANTITY))
}

impl CartMirror {
    /// Mirror an authoritative cart.
    #[must_use]
    pub fn from_cart(cart: Cart) -> Self {
        let item_count = cart.items.iter().map(|item| item.quantity).sum();
        Self {
            cart_id: Some(cart.id),
            items: cart.items,
            subtotal: cart.subtotal,
            item_count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line holding a product, if any.
    #[must_use]
    pub fn line_for(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Units of a product already in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line_for(product_id).map_or(0, |item| item.quantity)
    }

    /// Digest of line ids and quantities, used to notice cart changes
    /// during checkout.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut lines: Vec<String> = self
            .items
            .iter()
            .map(|item| format!("{}x{}", item.id, item.quantity))
            .collect();
        lines.sort();
        lines.join(";")
    }

    /// Apply an operation locally.
    pub fn apply(&mut self, op: &CartOp) {
        match op {
            CartOp::Add { product, quantity } => self.add(product, *quantity),
            CartOp::SetQuantity { item_id, quantity } => {
                if *quantity == 0 {
                    self.items.retain(|item| &item.id != item_id);
                } else if let Some(item) = self.items.iter_mut().find(|item| &item.id == item_id) {
                    item.quantity = (*quantity).min(line_cap(item.stock));
                }
            }
            CartOp::Remove { item_id } => self.items.retain(|item| &item.id != item_id),
            CartOp::Clear => self.items.clear(),
        }
        self.recompute();
    }

    fn add(&mut self, product: &Product, quantity: u32) {
        let cap = line_cap(product.stock);
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            item.quantity = item.quantity.saturating_add(quantity).min(cap);
            return;
        }

        let quantity = quantity.min(cap);
        self.items.push(CartItem {
            id: CartItemId::new(format!("{PENDING_PREFIX}{}", product.id)),
            product_id: product.id.clone(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            image_url: product.featured_image().map(|image| image.url.clone()),
            unit_price: product.price,
            quantity,
            line_total: product.price.times(quantity).unwrap_or(product.price),
            stock: product.stock,
        });
    }

    /// Recompute line totals, item count and subtotal.
    fn recompute(&mut self) {
        let mut subtotal: Option<Money> = None;
        for item in &mut self.items {
            if let Ok(total) = item.unit_price.times(item.quantity) {
                item.line_total = total;
            }
            subtotal = Some(match subtotal {
                None => item.line_total,
                Some(sum) => match sum.checked_add(item.line_total) {
                    Ok(sum) => sum,
                    Err(e) => {
                        tracing::warn!(error = %e, "Cannot total mixed-currency cart locally");
                        sum
                    }
                },
            });
        }

        self.item_count = self.items.iter().map(|item| item.quantity).sum();
        self.subtotal = subtotal.unwrap_or_else(|| Money::zero(self.subtotal.currency_code));
    }
}

/// Check an add-to-cart request against stock.
///
/// `in_cart` is how many units the cart already holds.
///
/// # Errors
///
/// Returns a shopper-facing message when the quantity is out of range, the
/// product is unavailable, or stock would be exceeded.
pub fn validate_add(product: &Product, quantity: u32, in_cart: u32) -> Result<u32, String> {
    let quantity = validate_quantity(quantity)?;
    if !product.is_purchasable() {
        return Err(format!("{} is out of stock.", product.name));
    }
    if let Some(stock) = product.stock
        && in_cart.saturating_add(quantity) > stock
    {
        return Err(if in_cart == 0 {
            format!("Only {stock} left in stock.")
        } else {
            format!("Only {stock} left in stock and {in_cart} are already in your cart.")
        });
    }
    if in_cart.saturating_add(quantity) > MAX_LINE_QUANTITY {
        return Err(format!(
            "You can add at most {MAX_LINE_QUANTITY} of one product."
        ));
    }
    Ok(quantity)
}

// =============================================================================
// CartService
// =============================================================================

/// Result of a cart mutation.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Mirror after the mutation (authoritative on success).
    pub cart: CartMirror,
    /// Shopper-facing error when the backend rejected the change.
    pub error: Option<String>,
}

/// Cart operations for one request.
pub struct CartService<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
    customer: Option<&'a CurrentCustomer>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a BackendClient,
        session: &'a Session,
        customer: Option<&'a CurrentCustomer>,
    ) -> Self {
        Self {
            backend,
            session,
            customer,
        }
    }

    fn caller<'c>(&'c self, cart_id: Option<&'c CartId>) -> Caller<'c> {
        Caller::new(self.customer.map(|c| c.token.as_str()), cart_id)
    }

    /// The session mirror, or an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(&self) -> Result<CartMirror, AppError> {
        Ok(self
            .session
            .get::<CartMirror>(session_keys::CART)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, mirror: &CartMirror) -> Result<(), AppError> {
        self.session.insert(session_keys::CART, mirror).await?;
        Ok(())
    }

    /// Drop the mirror without touching the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn forget(&self) -> Result<(), AppError> {
        self.session.remove_value(session_keys::CART).await?;
        Ok(())
    }

    /// Refresh the mirror from the backend.
    ///
    /// Keeps the current mirror when the backend is unreachable.
    ///
    /// # Errors
    ///
    /// Returns `Backend(Unauthorized)` when the customer's token was
    /// rejected, or an error if the session store fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartMirror, AppError> {
        let mirror = self.load().await?;
        if mirror.cart_id.is_none() && self.customer.is_none() {
            return Ok(mirror);
        }

        match self.backend.get_cart(self.caller(mirror.cart_id.as_ref())).await {
            Ok(cart) => {
                let fresh = CartMirror::from_cart(cart);
                self.save(&fresh).await?;
                Ok(fresh)
            }
            Err(BackendError::Unauthorized) if self.customer.is_some() => {
                Err(BackendError::Unauthorized.into())
            }
            Err(BackendError::NotFound(_)) => {
                // The backend expired the guest cart
                let empty = CartMirror::default();
                self.save(&empty).await?;
                Ok(empty)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh cart, showing mirror");
                Ok(mirror)
            }
        }
    }

    /// Apply a change optimistically and sync it with the backend.
    ///
    /// # Errors
    ///
    /// Returns `Backend(Unauthorized)` when the customer's token was
    /// rejected, or an error if the session store fails. Other backend
    /// failures are reported in [`MutationOutcome::error`].
    #[instrument(skip(self, op), fields(op = op.name()))]
    pub async fn mutate(&self, op: CartOp) -> Result<MutationOutcome, AppError> {
        let snapshot = self.load().await?;
        let mut optimistic = snapshot.clone();
        optimistic.apply(&op);
        self.save(&optimistic).await?;

        let result = self.send(&snapshot, &op).await;

        match result {
            Ok(cart) => {
                let cart = cart.map_or(optimistic, CartMirror::from_cart);
                self.save(&cart).await?;
                add_breadcrumb("cart", op.name(), None);
                Ok(MutationOutcome { cart, error: None })
            }
            Err(BackendError::Unauthorized) if self.customer.is_some() => {
                self.save(&snapshot).await?;
                Err(BackendError::Unauthorized.into())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cart mutation failed, resyncing");
                let message = e.user_message();
                let cart = self.resync(snapshot).await;
                self.save(&cart).await?;
                Ok(MutationOutcome {
                    cart,
                    error: Some(message),
                })
            }
        }
    }

    /// Send one operation. `Ok(None)` means the backend returned no cart.
    async fn send(&self, snapshot: &CartMirror, op: &CartOp) -> Result<Option<Cart>, BackendError> {
        let caller = self.caller(snapshot.cart_id.as_ref());
        match op {
            CartOp::Add { product, quantity } => self
                .backend
                .add_cart_item(caller, &product.id, *quantity)
                .await
                .map(Some),
            CartOp::SetQuantity { item_id, .. } | CartOp::Remove { item_id }
                if item_id.as_str().starts_with(PENDING_PREFIX) =>
            {
                Err(BackendError::NotFound(item_id.to_string()))
            }
            CartOp::SetQuantity {
                item_id,
                quantity: 0,
            }
            | CartOp::Remove { item_id } => self
                .backend
                .remove_cart_item(caller, item_id)
                .await
                .map(Some),
            CartOp::SetQuantity { item_id, quantity } => self
                .backend
                .update_cart_item(caller, item_id, *quantity)
                .await
                .map(Some),
            CartOp::Clear => {
                if snapshot.cart_id.is_none() && self.customer.is_none() {
                    return Ok(None);
                }
                self.backend.clear_cart(caller).await.map(|()| None)
            }
        }
    }

    /// Authoritative cart after a failed mutation, else the snapshot.
    async fn resync(&self, snapshot: CartMirror) -> CartMirror {
        if snapshot.cart_id.is_none() && self.customer.is_none() {
            return snapshot;
        }
        match self
            .backend
            .get_cart(self.caller(snapshot.cart_id.as_ref()))
            .await
        {
            Ok(cart) => CartMirror::from_cart(cart),
            Err(e) => {
                tracing::warn!(error = %e, "Cart refetch failed, restoring snapshot");
                snapshot
            }
        }
    }

    /// After login, fold the guest cart into the customer's cart.
    ///
    /// Failures are logged; the customer keeps whatever cart the backend has.
    #[instrument(skip(self, customer))]
    pub async fn adopt_after_login(&self, customer: &CurrentCustomer) -> Result<(), AppError> {
        let guest = self.load().await?;
        let caller = Caller::customer(&customer.token);

        let result = match &guest.cart_id {
            Some(guest_cart_id) if !guest.is_empty() => {
                self.backend.merge_cart(caller, guest_cart_id).await
            }
            _ => self.backend.get_cart(caller).await,
        };

        match result {
            Ok(cart) => self.save(&CartMirror::from_cart(cart)).await,
            Err(BackendError::NotFound(_)) => self.save(&CartMirror::default()).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to merge guest cart at login");
                self.save(&CartMirror::default()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn ars(amount: &str) -> Money {
        Money::new(
            Decimal::from_str(amount).unwrap_or_else(|e| panic!("{e}")),
            CurrencyCode::Ars,
        )
    }

    fn product(id: &str, price: &str, stock: Option<u32>) -> Product {
        Product {
            id: ProductId::new(id),
            slug: id.to_string(),
            name: format!("Product {id}"),
            description: String::new(),
            price: ars(price),
            compare_at_price: None,
            images: vec![],
            category_slug: None,
            available: true,
            stock,
            featured: false,
        }
    }

    fn add(id: &str, price: &str, stock: Option<u32>, quantity: u32) -> CartOp {
        CartOp::Add {
            product: Box::new(product(id, price, stock)),
            quantity,
        }
    }

    #[test]
    fn test_add_creates_pending_line() {
        let mut cart = CartMirror::default();
        cart.apply(&add("p1", "100", None, 2));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].id.as_str(), "pending:p1");
        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.subtotal, ars("200"));
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = CartMirror::default();
        cart.apply(&add("p1", "100", None, 2));
        cart.apply(&add("p1", "100", None, 3));
        cart.apply(&add("p2", "50.50", None, 1));

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.quantity_of(&ProductId::new("p1")), 5);
        assert_eq!(cart.item_count, 6);
        assert_eq!(cart.subtotal, ars("550.50"));
    }

    #[test]
    fn test_add_clamps_to_stock_and_limit() {
        let mut cart = CartMirror::default();
        cart.apply(&add("p1", "10", Some(3), 5));
        assert_eq!(cart.item_count, 3);

        let mut cart = CartMirror::default();
        cart.apply(&add("p2", "10", None, 150));
        assert_eq!(cart.item_count, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_and_zero_removes() {
        let mut cart = CartMirror::default();
        cart.apply(&add("p1", "100", None, 1));
        let item_id = cart.items[0].id.clone();

        cart.apply(&CartOp::SetQuantity {
            item_id: item_id.clone(),
            quantity: 4,
        });
        assert_eq!(cart.item_count, 4);
        assert_eq!(cart.items[0].line_total, ars("400"));

        cart.apply(&CartOp::SetQuantity {
            item_id,
            quantity: 0,
        });
        assert!(cart.is_empty());
        assert_eq!(cart.item_count, 0);
        assert!(cart.subtotal.is_zero());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = CartMirror::default();
        cart.apply(&add("p1", "100", None, 1));
        cart.apply(&add("p2", "100", None, 1));
        let first = cart.items[0].id.clone();

        cart.apply(&CartOp::Remove { item_id: first });
        assert_eq!(cart.items.len(), 1);

        cart.apply(&CartOp::Clear);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_signature_ignores_order_but_tracks_quantity() {
        let mut a = CartMirror::default();
        a.apply(&add("p1", "1", None, 1));
        a.apply(&add("p2", "1", None, 2));

        let mut b = a.clone();
        b.items.reverse();
        assert_eq!(a.signature(), b.signature());

        b.apply(&add("p2", "1", None, 1));
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_validate_add() {
        let p = product("p1", "10", Some(5));
        assert_eq!(validate_add(&p, 2, 0), Ok(2));
        assert!(validate_add(&p, 0, 0).is_err());
        assert_eq!(
            validate_add(&p, 6, 0),
            Err("Only 5 left in stock.".to_string())
        );
        assert!(validate_add(&p, 2, 4).is_err());

        let sold_out = Product {
            available: false,
            ..product("p2", "10", None)
        };
        assert!(validate_add(&sold_out, 1, 0).is_err());

        let unlimited = product("p3", "10", None);
        assert!(validate_add(&unlimited, 50, 60).is_err());
    }

    #[test]
    fn test_from_cart_counts_items() {
        let cart = Cart {
            id: CartId::new("c1"),
            items: vec![CartItem {
                id: CartItemId::new("i1"),
                product_id: ProductId::new("p1"),
                slug: "p1".to_string(),
                name: "P1".to_string(),
                image_url: None,
                unit_price: ars("10"),
                quantity: 3,
                line_total: ars("30"),
                stock: None,
            }],
            subtotal: ars("30"),
            item_count: 0,
        };
        let mirror = CartMirror::from_cart(cart);
        assert_eq!(mirror.item_count, 3);
        assert_eq!(mirror.cart_id, Some(CartId::new("c1")));
    }
}
