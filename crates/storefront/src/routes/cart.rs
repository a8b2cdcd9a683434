//! Cart route handlers.
//!
//! Every change is a plain form POST answered with a redirect; the session
//! mirror is updated optimistically before the backend call so the cart
//! badge is right even when the backend is slow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::CartItemId;
use vitrina_core::validation::validate_quantity;

use crate::backend::BackendError;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, PageContext, is_local_path, set_flash};
use crate::models::Flash;
use crate::services::cart::{CartMirror, CartOp, CartService, MutationOutcome, validate_add};
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub slug: String,
    pub quantity: Option<u32>,
    /// Page to return to, defaults to the cart.
    pub return_to: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartMirror,
}

/// Display cart page.
#[instrument(skip(state, session, customer, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    CspNonce(nonce): CspNonce,
) -> Result<CartShowTemplate> {
    let cart = CartService::new(state.backend(), &session, customer.as_ref())
        .refresh()
        .await?;
    let page = PageContext::load(&state, &session, nonce).await;

    Ok(CartShowTemplate { page, cart })
}

/// Add a product to the cart.
#[instrument(skip(state, session, customer))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let back = form
        .return_to
        .as_deref()
        .filter(|path| is_local_path(path))
        .unwrap_or(CART_PATH)
        .to_string();

    let product = match state.backend().get_product(&form.slug).await {
        Ok(product) => product,
        Err(BackendError::NotFound(_)) => {
            set_flash(&session, Flash::error("That product is no longer available.")).await;
            return Ok(Redirect::to(&back).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let carts = CartService::new(state.backend(), &session, customer.as_ref());
    let in_cart = carts.load().await?.quantity_of(&product.id);
    let quantity = match validate_add(&product, form.quantity.unwrap_or(1), in_cart) {
        Ok(quantity) => quantity,
        Err(message) => {
            set_flash(&session, Flash::error(message)).await;
            return Ok(Redirect::to(&back).into_response());
        }
    };

    let name = product.name.clone();
    let outcome = carts
        .mutate(CartOp::Add {
            product: Box::new(product),
            quantity,
        })
        .await?;
    report(&session, outcome, format!("Added {name} to your cart.")).await;

    Ok(Redirect::to(&back).into_response())
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, session, customer))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    if form.quantity != 0
        && let Err(message) = validate_quantity(form.quantity)
    {
        set_flash(&session, Flash::error(message)).await;
        return Ok(Redirect::to(CART_PATH));
    }

    let outcome = CartService::new(state.backend(), &session, customer.as_ref())
        .mutate(CartOp::SetQuantity {
            item_id: CartItemId::new(form.item_id),
            quantity: form.quantity,
        })
        .await?;
    report(&session, outcome, "Cart updated.").await;

    Ok(Redirect::to(CART_PATH))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, customer))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let outcome = CartService::new(state.backend(), &session, customer.as_ref())
        .mutate(CartOp::Remove {
            item_id: CartItemId::new(form.item_id),
        })
        .await?;
    report(&session, outcome, "Item removed from your cart.").await;

    Ok(Redirect::to(CART_PATH))
}

/// Empty the cart.
#[instrument(skip(state, session, customer))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Redirect> {
    let outcome = CartService::new(state.backend(), &session, customer.as_ref())
        .mutate(CartOp::Clear)
        .await?;
    report(&session, outcome, "Your cart is empty.").await;

    Ok(Redirect::to(CART_PATH))
}

/// Flash the backend's complaint, or the success notice.
async fn report(session: &Session, outcome: MutationOutcome, success: impl Into<String>) {
    let flash = match outcome.error {
        Some(message) => Flash::error(message),
        None => Flash::success(success),
    };
    set_flash(session, flash).await;
}
