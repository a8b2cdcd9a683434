//! Account route handlers.
//!
//! Every handler requires a signed-in customer; orders and addresses are
//! read from and written to the backend with the customer's token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::validation::validate_address;
use vitrina_core::{AddressId, FieldErrors, OrderId};

use super::forms::AddressForm;
use crate::backend::{BackendError, Order, OrderSummary, SavedAddress};
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, set_flash};
use crate::models::{CurrentCustomer, Flash};
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDERS: usize = 5;

const ADDRESSES_PATH: &str = "/account/addresses";

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub customer: CurrentCustomer,
    /// Most recent orders only.
    pub orders: Vec<OrderSummary>,
    pub has_more_orders: bool,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderSummary>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub page: PageContext,
    pub order: Order,
}

/// Address book template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub page: PageContext,
    pub addresses: Vec<SavedAddress>,
}

/// New or edit address form template.
#[derive(Template, WebTemplate)]
#[template(path = "account/address_form.html")]
pub struct AddressFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub form: AddressForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Display account overview.
#[instrument(skip(state, customer, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
) -> Result<AccountIndexTemplate> {
    let mut orders = state.backend().list_orders(customer.caller(None)).await?;
    let has_more_orders = orders.len() > RECENT_ORDERS;
    orders.truncate(RECENT_ORDERS);

    Ok(AccountIndexTemplate {
        page,
        customer,
        orders,
        has_more_orders,
    })
}

/// Display order history.
#[instrument(skip(state, customer, page))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
) -> Result<OrdersTemplate> {
    let orders = state.backend().list_orders(customer.caller(None)).await?;
    Ok(OrdersTemplate { page, orders })
}

/// Display a single order.
#[instrument(skip(state, customer, page))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<OrderTemplate> {
    let order = state
        .backend()
        .get_order(customer.caller(None), &OrderId::new(id))
        .await?;
    Ok(OrderTemplate { page, order })
}

/// Display the address book.
#[instrument(skip(state, customer, page))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
) -> Result<AddressesTemplate> {
    let addresses = state
        .backend()
        .list_addresses(customer.caller(None))
        .await?;
    Ok(AddressesTemplate { page, addresses })
}

/// Display the new address form.
#[instrument(skip(customer, page))]
pub async fn new_address(
    RequireAuth(customer): RequireAuth,
    page: PageContext,
) -> AddressFormTemplate {
    AddressFormTemplate {
        page,
        title: "New address",
        action: ADDRESSES_PATH.to_string(),
        form: AddressForm::for_recipient(&customer.first_name, &customer.last_name),
        errors: FieldErrors::new(),
        error: None,
    }
}

/// Display the edit address form.
#[instrument(skip(state, customer, page))]
pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<AddressFormTemplate> {
    let saved = state
        .backend()
        .get_address(customer.caller(None), &AddressId::new(id))
        .await?;

    Ok(AddressFormTemplate {
        page,
        title: "Edit address",
        action: address_path(&saved.id),
        form: AddressForm::from_saved(&saved),
        errors: FieldErrors::new(),
        error: None,
    })
}

fn address_path(id: &AddressId) -> String {
    format!("{ADDRESSES_PATH}/{}", urlencoding::encode(id.as_str()))
}

/// Create an address.
#[instrument(skip(state, session, customer, page, form))]
pub async fn create_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let address = form.to_address();
    let errors = validate_address(&address);
    if !errors.is_empty() {
        return Ok(form_error(page, "New address", ADDRESSES_PATH.to_string(), form, errors, None));
    }

    let result = state
        .backend()
        .create_address(
            customer.caller(None),
            form.label(),
            &address,
            form.wants_default(),
        )
        .await;

    match result {
        Ok(_) => {
            set_flash(&session, Flash::success("Address saved.")).await;
            Ok(Redirect::to(ADDRESSES_PATH).into_response())
        }
        Err(BackendError::Validation { message, fields }) => Ok(form_error(
            page,
            "New address",
            ADDRESSES_PATH.to_string(),
            form,
            fields,
            Some(message),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Update an address.
#[instrument(skip(state, session, customer, page, form))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let id = AddressId::new(id);
    let action = address_path(&id);
    let address = form.to_address();
    let errors = validate_address(&address);
    if !errors.is_empty() {
        return Ok(form_error(page, "Edit address", action, form, errors, None));
    }

    let result = state
        .backend()
        .update_address(
            customer.caller(None),
            &id,
            form.label(),
            &address,
            form.wants_default(),
        )
        .await;

    match result {
        Ok(_) => {
            set_flash(&session, Flash::success("Address updated.")).await;
            Ok(Redirect::to(ADDRESSES_PATH).into_response())
        }
        Err(BackendError::Validation { message, fields }) => Ok(form_error(
            page,
            "Edit address",
            action,
            form,
            fields,
            Some(message),
        )),
        Err(e) => Err(e.into()),
    }
}

fn form_error(
    page: PageContext,
    title: &'static str,
    action: String,
    form: AddressForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        AddressFormTemplate {
            page,
            title,
            action,
            form,
            errors,
            error,
        },
    )
        .into_response()
}

/// Delete an address.
#[instrument(skip(state, session, customer))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    match state
        .backend()
        .delete_address(customer.caller(None), &AddressId::new(id))
        .await
    {
        Ok(()) | Err(BackendError::NotFound(_)) => {
            set_flash(&session, Flash::success("Address removed.")).await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(ADDRESSES_PATH))
}
