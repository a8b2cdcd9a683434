//! Checkout route handlers.
//!
//! The wizard runs shipping, payment, review. Every handler first loads the
//! cart and the wizard ([`begin`]), sending the shopper back to the cart
//! when it is empty and to the first unfinished step when they skip ahead.

use std::ops::ControlFlow;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::validation::validate_address;
use vitrina_core::{
    AddressId, CheckoutStep, FieldErrors, Money, OrderId, PaymentMethodId, PaymentStatus,
    ShippingAddress, ShippingOptionId,
};

use super::forms::AddressForm;
use crate::backend::{BackendError, CheckoutResult, Order, SavedAddress};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAuth, set_flash};
use crate::models::{CurrentCustomer, Flash, session_keys};
use crate::services::cart::{CartMirror, CartService};
use crate::services::checkout::{CheckoutWizard, WizardError, validate_payment_redirect};
use crate::state::AppState;

/// Cart and wizard for the current request.
struct Checkout {
    cart: CartMirror,
    wizard: CheckoutWizard,
}

/// Load the cart and wizard, or the redirect to answer with instead.
async fn begin(
    state: &AppState,
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<ControlFlow<Response, Checkout>> {
    let cart = CartService::new(state.backend(), session, Some(customer))
        .refresh()
        .await?;

    if cart.is_empty() {
        set_flash(session, Flash::info("Your cart is empty.")).await;
        return Ok(ControlFlow::Break(Redirect::to("/cart").into_response()));
    }

    let mut wizard = CheckoutWizard::load(session).await?;
    if wizard.sync_cart(&cart.signature()) {
        set_flash(
            session,
            Flash::info("Your cart changed. Please choose shipping again."),
        )
        .await;
    }
    wizard.save(session).await?;

    Ok(ControlFlow::Continue(Checkout { cart, wizard }))
}

/// Unwrap [`begin`], returning its redirect from the handler.
macro_rules! begin_or_return {
    ($state:expr, $session:expr, $customer:expr) => {
        match begin($state, $session, $customer).await? {
            ControlFlow::Continue(checkout) => checkout,
            ControlFlow::Break(response) => return Ok(response),
        }
    };
}

/// Redirect to `step` when an earlier step is unfinished.
fn gate(wizard: &CheckoutWizard, step: CheckoutStep) -> Option<Response> {
    wizard
        .gate(step)
        .err()
        .map(|first| Redirect::to(&first.path()).into_response())
}

/// Progress indicator entry.
#[derive(Debug, Clone)]
pub struct StepView {
    pub label: &'static str,
    pub path: String,
    pub current: bool,
    pub done: bool,
}

fn steps(wizard: &CheckoutWizard, current: CheckoutStep) -> Vec<StepView> {
    CheckoutStep::ALL
        .into_iter()
        .map(|step| StepView {
            label: step.label(),
            path: step.path(),
            current: step == current,
            done: wizard.is_complete(step),
        })
        .collect()
}

/// Radio button row for a shipping option or payment method.
#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub price: Option<Money>,
    pub selected: bool,
}

fn shipping_choices(wizard: &CheckoutWizard) -> Vec<ChoiceView> {
    wizard
        .shipping_options
        .iter()
        .map(|option| ChoiceView {
            id: option.id.to_string(),
            title: format!("{} {}", option.carrier, option.service),
            detail: option.delivery_estimate(),
            price: Some(option.cost),
            selected: wizard.shipping_option_id.as_ref() == Some(&option.id),
        })
        .collect()
}

fn payment_choices(wizard: &CheckoutWizard) -> Vec<ChoiceView> {
    wizard
        .payment_methods
        .iter()
        .map(|method| ChoiceView {
            id: method.id.to_string(),
            title: method.name.clone(),
            detail: if method.kind.redirects() {
                "You will be sent to Mercado Pago to pay.".to_string()
            } else {
                method.description.clone().unwrap_or_default()
            },
            price: None,
            selected: wizard.payment_method_id.as_ref() == Some(&method.id),
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Shipping step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub page: PageContext,
    pub steps: Vec<StepView>,
    pub form: AddressForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub saved_addresses: Vec<SavedAddress>,
    pub address: Option<ShippingAddress>,
    pub options: Vec<ChoiceView>,
}

/// Payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub steps: Vec<StepView>,
    pub methods: Vec<ChoiceView>,
    pub notes: String,
}

/// Review step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/review.html")]
pub struct ReviewTemplate {
    pub page: PageContext,
    pub steps: Vec<StepView>,
    pub cart: CartMirror,
    pub address: ShippingAddress,
    pub shipping: ChoiceView,
    pub payment: ChoiceView,
    pub notes: Option<String>,
    pub total: Option<Money>,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: PageContext,
    pub order: Order,
}

/// Payment return template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment_status.html")]
pub struct PaymentStatusTemplate {
    pub page: PageContext,
    pub status: PaymentStatus,
    pub order: Option<Order>,
    pub payment_id: Option<String>,
}

// =============================================================================
// Forms
// =============================================================================

/// Address step form: either a saved address or typed fields.
#[derive(Debug, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub saved_address_id: Option<String>,
    #[serde(flatten)]
    pub address: AddressForm,
}

/// Shipping option choice.
#[derive(Debug, Deserialize)]
pub struct ShippingOptionForm {
    pub shipping_option_id: String,
}

/// Payment method choice.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub payment_method_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters on the payment provider's back URL.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentReturnParams {
    pub status: Option<String>,
    pub collection_status: Option<String>,
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Send the shopper to the first unfinished step.
#[instrument(skip(state, session, customer))]
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
) -> Result<Response> {
    let checkout = begin_or_return!(&state, &session, &customer);
    Ok(Redirect::to(&checkout.wizard.first_incomplete().path()).into_response())
}

/// Display the shipping step.
#[instrument(skip(state, session, customer, nonce))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let checkout = begin_or_return!(&state, &session, &customer);
    let saved_addresses = saved_addresses(&state, &customer).await?;

    let form = match (&checkout.wizard.address, saved_addresses.iter().find(|a| a.is_default)) {
        (Some(address), _) => AddressForm::from_address(address),
        (None, Some(saved)) => AddressForm::from_address(&saved.address),
        (None, None) => AddressForm::for_recipient(&customer.first_name, &customer.last_name),
    };

    let page = PageContext::load(&state, &session, nonce).await;
    Ok(ShippingTemplate {
        page,
        steps: steps(&checkout.wizard, CheckoutStep::Shipping),
        form,
        errors: FieldErrors::new(),
        error: None,
        saved_addresses,
        address: checkout.wizard.address.clone(),
        options: shipping_choices(&checkout.wizard),
    }
    .into_response())
}

/// The customer's address book; an outage leaves it empty.
async fn saved_addresses(
    state: &AppState,
    customer: &CurrentCustomer,
) -> Result<Vec<SavedAddress>> {
    match state.backend().list_addresses(customer.caller(None)).await {
        Ok(addresses) => Ok(addresses),
        Err(BackendError::Unauthorized) => Err(BackendError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch saved addresses");
            Ok(Vec::new())
        }
    }
}

/// Submit the shipping address and quote shipping options for it.
#[instrument(skip(state, session, customer, nonce, form))]
pub async fn submit_shipping(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let mut checkout = begin_or_return!(&state, &session, &customer);

    let saved_id = form
        .saved_address_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let address = match saved_id {
        Some(id) => {
            state
                .backend()
                .get_address(customer.caller(None), &AddressId::new(id))
                .await?
                .address
        }
        None => form.address.to_address(),
    };

    let errors = validate_address(&address);
    if !errors.is_empty() {
        return rerender_shipping(&state, &session, &customer, &checkout, nonce, form, errors, None)
            .await;
    }

    let quoted = state
        .backend()
        .shipping_options(customer.caller(checkout.cart.cart_id.as_ref()), &address)
        .await;
    let options = match quoted {
        Ok(options) if options.is_empty() => {
            let message = "We don't ship to that address yet.".to_string();
            return rerender_shipping(
                &state,
                &session,
                &customer,
                &checkout,
                nonce,
                form,
                FieldErrors::new(),
                Some(message),
            )
            .await;
        }
        Ok(options) => options,
        Err(BackendError::Validation { message, fields }) => {
            return rerender_shipping(
                &state,
                &session,
                &customer,
                &checkout,
                nonce,
                form,
                fields,
                Some(message),
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    };

    checkout.wizard.set_address(address, options);
    checkout.wizard.save(&session).await?;
    add_breadcrumb("checkout", "Shipping address set", None);

    Ok(Redirect::to("/checkout/shipping#shipping-options").into_response())
}

/// Show the shipping form again with what the shopper typed.
#[allow(clippy::too_many_arguments)]
async fn rerender_shipping(
    state: &AppState,
    session: &Session,
    customer: &CurrentCustomer,
    checkout: &Checkout,
    nonce: String,
    form: ShippingForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Result<Response> {
    let saved_addresses = saved_addresses(state, customer).await?;
    let page = PageContext::load(state, session, nonce).await;

    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        ShippingTemplate {
            page,
            steps: steps(&checkout.wizard, CheckoutStep::Shipping),
            form: form.address,
            errors,
            error,
            saved_addresses,
            address: checkout.wizard.address.clone(),
            options: shipping_choices(&checkout.wizard),
        },
    )
        .into_response())
}

/// Choose a shipping option and fetch the payment methods for it.
#[instrument(skip(state, session, customer))]
pub async fn choose_shipping(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Form(form): Form<ShippingOptionForm>,
) -> Result<Response> {
    let mut checkout = begin_or_return!(&state, &session, &customer);
    let option_id = ShippingOptionId::new(form.shipping_option_id);

    if let Err(e) = checkout.wizard.check_shipping_option(&option_id) {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to(&CheckoutStep::Shipping.path()).into_response());
    }
    let Some(address) = checkout.wizard.address.clone() else {
        return Ok(Redirect::to(&CheckoutStep::Shipping.path()).into_response());
    };

    let methods = match state
        .backend()
        .payment_methods(
            customer.caller(checkout.cart.cart_id.as_ref()),
            &address,
            &option_id,
        )
        .await
    {
        Ok(methods) => methods,
        Err(BackendError::Unauthorized) => return Err(BackendError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch payment methods");
            set_flash(&session, Flash::error(e.user_message())).await;
            return Ok(Redirect::to(&CheckoutStep::Shipping.path()).into_response());
        }
    };

    if let Err(e) = checkout.wizard.choose_shipping_option(option_id, methods) {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to(&CheckoutStep::Shipping.path()).into_response());
    }
    checkout.wizard.save(&session).await?;

    Ok(Redirect::to(&CheckoutStep::Payment.path()).into_response())
}

/// Display the payment step.
#[instrument(skip(state, session, customer, nonce))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let checkout = begin_or_return!(&state, &session, &customer);
    if let Some(redirect) = gate(&checkout.wizard, CheckoutStep::Payment) {
        return Ok(redirect);
    }

    let page = PageContext::load(&state, &session, nonce).await;
    Ok(PaymentTemplate {
        page,
        steps: steps(&checkout.wizard, CheckoutStep::Payment),
        methods: payment_choices(&checkout.wizard),
        notes: checkout.wizard.notes.clone().unwrap_or_default(),
    }
    .into_response())
}

/// Choose a payment method.
#[instrument(skip(state, session, customer))]
pub async fn choose_payment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let mut checkout = begin_or_return!(&state, &session, &customer);
    if let Some(redirect) = gate(&checkout.wizard, CheckoutStep::Payment) {
        return Ok(redirect);
    }

    if let Err(e) = checkout
        .wizard
        .choose_payment_method(PaymentMethodId::new(form.payment_method_id))
    {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to(&CheckoutStep::Payment.path()).into_response());
    }
    checkout.wizard.notes = form.notes;
    checkout.wizard.save(&session).await?;

    Ok(Redirect::to(&CheckoutStep::Review.path()).into_response())
}

/// Display the review step.
#[instrument(skip(state, session, customer, nonce))]
pub async fn review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let checkout = begin_or_return!(&state, &session, &customer);
    if let Some(redirect) = gate(&checkout.wizard, CheckoutStep::Review) {
        return Ok(redirect);
    }

    render_review(&state, &session, nonce, &checkout, None, StatusCode::OK).await
}

async fn render_review(
    state: &AppState,
    session: &Session,
    nonce: String,
    checkout: &Checkout,
    error: Option<String>,
    status: StatusCode,
) -> Result<Response> {
    let wizard = &checkout.wizard;
    let (Some(address), Some(shipping), Some(payment)) = (
        wizard.address.clone(),
        shipping_choices(wizard).into_iter().find(|c| c.selected),
        payment_choices(wizard).into_iter().find(|c| c.selected),
    ) else {
        return Ok(Redirect::to(&wizard.first_incomplete().path()).into_response());
    };

    let page = PageContext::load(state, session, nonce).await;
    Ok((
        status,
        ReviewTemplate {
            page,
            steps: steps(wizard, CheckoutStep::Review),
            cart: checkout.cart.clone(),
            address,
            shipping,
            payment,
            notes: wizard.notes.clone().filter(|n| !n.trim().is_empty()),
            total: wizard.total(&checkout.cart),
            error,
        },
    )
        .into_response())
}

/// Place the order.
///
/// A provider redirect is checked against the allow-list before the
/// browser is sent there; a confirmed order ends the checkout.
#[instrument(skip(state, session, customer, nonce))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let mut checkout = begin_or_return!(&state, &session, &customer);
    if let Some(redirect) = gate(&checkout.wizard, CheckoutStep::Review) {
        return Ok(redirect);
    }

    let request = match checkout.wizard.build_request(&checkout.cart) {
        Ok(request) => request,
        Err(WizardError::Incomplete(step)) => return Ok(Redirect::to(&step.path()).into_response()),
        Err(WizardError::EmptyCart) => return Ok(Redirect::to("/cart").into_response()),
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    // Saved before sending so a resubmission reuses the key
    let key = checkout.wizard.idempotency_key();
    checkout.wizard.save(&session).await?;

    let result = state
        .backend()
        .place_order(
            customer.caller(checkout.cart.cart_id.as_ref()),
            &request,
            key,
        )
        .await;

    match result {
        Ok(CheckoutResult::Redirect { url, order_id }) => {
            let url = validate_payment_redirect(&url, &state.config().payment_redirect_hosts)
                .inspect_err(|e| {
                    tracing::error!(error = %e, order_id = %order_id, "Refusing payment redirect");
                })?;
            session.insert(session_keys::PENDING_ORDER, &order_id).await?;
            add_breadcrumb(
                "checkout",
                "Redirected to payment",
                Some(&[("order_id", order_id.as_str())]),
            );
            tracing::info!(order_id = %order_id, "Order placed, awaiting payment");
            Ok(Redirect::to(url.as_str()).into_response())
        }
        Ok(CheckoutResult::Confirmed { order }) => {
            finish(&state, &session, &customer).await?;
            add_breadcrumb(
                "checkout",
                "Order confirmed",
                Some(&[("order_id", order.id.as_str())]),
            );
            tracing::info!(order_id = %order.id, "Order confirmed");
            Ok(Redirect::to(&confirmation_path(&order.id)).into_response())
        }
        Err(BackendError::Validation { message, .. }) => {
            // The backend answered; a corrected order is a new request
            checkout.wizard.idempotency_key = None;
            checkout.wizard.save(&session).await?;
            render_review(
                &state,
                &session,
                nonce,
                &checkout,
                Some(message),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(BackendError::Unauthorized) => Err(BackendError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Placing order failed");
            render_review(
                &state,
                &session,
                nonce,
                &checkout,
                Some(e.user_message()),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}

fn confirmation_path(order_id: &OrderId) -> String {
    format!(
        "/checkout/confirmation/{}",
        urlencoding::encode(order_id.as_str())
    )
}

/// Drop the cart mirror and checkout state after a terminal result.
async fn finish(state: &AppState, session: &Session, customer: &CurrentCustomer) -> Result<()> {
    CartService::new(state.backend(), session, Some(customer))
        .forget()
        .await?;
    CheckoutWizard::clear(session).await?;
    session.remove_value(session_keys::PENDING_ORDER).await?;
    Ok(())
}

/// Display an order confirmation.
#[instrument(skip(state, customer, page))]
pub async fn confirmation(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<ConfirmationTemplate> {
    let order = state
        .backend()
        .get_order(customer.caller(None), &OrderId::new(id))
        .await?;
    Ok(ConfirmationTemplate { page, order })
}

/// Handle the payment provider's back URL.
///
/// Success or pending ends the checkout; a failed payment keeps the cart
/// and wizard so the shopper can try again from the review step.
#[instrument(skip(state, session, customer, nonce))]
pub async fn payment_return(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    CspNonce(nonce): CspNonce,
    Query(params): Query<PaymentReturnParams>,
) -> Result<Response> {
    let status =
        PaymentStatus::from_query(params.status.as_deref().or(params.collection_status.as_deref()));

    let pending: Option<OrderId> = session.get(session_keys::PENDING_ORDER).await?;
    let order_id = params
        .external_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(OrderId::new)
        .or(pending);

    let order = match &order_id {
        Some(id) => match state.backend().get_order(customer.caller(None), id).await {
            Ok(order) => Some(order),
            Err(BackendError::Unauthorized) => return Err(BackendError::Unauthorized.into()),
            Err(e) => {
                tracing::warn!(error = %e, order_id = %id, "Failed to fetch returned order");
                None
            }
        },
        None => None,
    };

    tracing::info!(
        status = ?status,
        order_id = order_id.as_ref().map(OrderId::as_str),
        "Payment return"
    );

    if status.is_failure() {
        let mut wizard = CheckoutWizard::load(&session).await?;
        wizard.idempotency_key = None;
        wizard.save(&session).await?;
    } else {
        finish(&state, &session, &customer).await?;
    }

    let page = PageContext::load(&state, &session, nonce).await;
    Ok(PaymentStatusTemplate {
        page,
        status,
        order,
        payment_id: params.payment_id,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use vitrina_core::CurrencyCode;

    use super::*;
    use crate::backend::{PaymentKind, PaymentMethod, ShippingOption};

    fn ars(amount: &str) -> Money {
        Money::new(
            Decimal::from_str(amount).unwrap_or_else(|e| panic!("{e}")),
            CurrencyCode::Ars,
        )
    }

    fn wizard() -> CheckoutWizard {
        CheckoutWizard {
            address: Some(ShippingAddress::default()),
            shipping_options: vec![ShippingOption {
                id: ShippingOptionId::new("andreani"),
                carrier: "Andreani".to_string(),
                service: "Estándar".to_string(),
                cost: ars("2500"),
                min_days: Some(3),
                max_days: Some(5),
            }],
            shipping_option_id: Some(ShippingOptionId::new("andreani")),
            payment_methods: vec![PaymentMethod {
                id: PaymentMethodId::new("mp"),
                name: "Mercado Pago".to_string(),
                kind: PaymentKind::MercadoPago,
                description: None,
            }],
            payment_method_id: None,
            ..CheckoutWizard::default()
        }
    }

    #[test]
    fn test_steps_mark_progress() {
        let steps = steps(&wizard(), CheckoutStep::Payment);
        assert_eq!(steps.len(), 3);
        assert!(steps[0].done);
        assert!(steps[1].current);
        assert!(!steps[1].done);
    }

    #[test]
    fn test_choices_mark_selection() {
        let wizard = wizard();
        let shipping = shipping_choices(&wizard);
        assert_eq!(shipping[0].title, "Andreani Estándar");
        assert_eq!(shipping[0].detail, "3-5 business days");
        assert!(shipping[0].selected);

        let payment = payment_choices(&wizard);
        assert!(!payment[0].selected);
        assert!(payment[0].detail.contains("Mercado Pago"));
    }

    #[test]
    fn test_gate_redirects_to_first_incomplete_step() {
        let response = gate(&wizard(), CheckoutStep::Review);
        let location = response
            .as_ref()
            .and_then(|r| r.headers().get(axum::http::header::LOCATION))
            .and_then(|v| v.to_str().ok());
        assert_eq!(location, Some("/checkout/payment"));
        assert!(gate(&wizard(), CheckoutStep::Payment).is_none());
    }

    #[test]
    fn test_confirmation_path_encodes_id() {
        assert_eq!(
            confirmation_path(&OrderId::new("ord 1")),
            "/checkout/confirmation/ord%201"
        );
    }
}
