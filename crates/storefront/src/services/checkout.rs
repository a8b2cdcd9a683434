//! Checkout wizard state and payment redirect checks.
//!
//! The wizard is three linear steps (shipping, payment, review) whose state
//! lives in the session. Each selection depends on the ones before it, so
//! changing an earlier answer clears everything after it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;
use url::Url;
use uuid::Uuid;

use vitrina_core::{CheckoutStep, Money, PaymentMethodId, ShippingAddress, ShippingOptionId};

use super::cart::CartMirror;
use crate::backend::{CheckoutRequest, PaymentMethod, ShippingOption};
use crate::models::session_keys;

/// Errors from wizard transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Please choose one of the listed shipping options.")]
    UnknownShippingOption,

    #[error("Please choose one of the listed payment methods.")]
    UnknownPaymentMethod,

    #[error("The {0} step is not complete.")]
    Incomplete(CheckoutStep),

    #[error("Your cart is empty.")]
    EmptyCart,
}

/// Session-stored checkout progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutWizard {
    pub address: Option<ShippingAddress>,
    #[serde(default)]
    pub shipping_options: Vec<ShippingOption>,
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    pub payment_method_id: Option<PaymentMethodId>,
    /// Cart signature when shipping options were quoted.
    pub cart_signature: Option<String>,
    /// Reused on resubmission so the backend places the order once.
    pub idempotency_key: Option<Uuid>,
    pub notes: Option<String>,
}

impl CheckoutWizard {
    /// Load from the session, or start fresh.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(session
            .get::<Self>(session_keys::CHECKOUT)
            .await?
            .unwrap_or_default())
    }

    /// Persist to the session.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(session_keys::CHECKOUT, self).await
    }

    /// Remove from the session.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove_value(session_keys::CHECKOUT).await?;
        Ok(())
    }

    /// Whether a step's answers are all present.
    ///
    /// Review has no answers of its own and is never complete; placing the
    /// order ends the wizard.
    #[must_use]
    pub fn is_complete(&self, step: CheckoutStep) -> bool {
        match step {
            CheckoutStep::Shipping => self.address.is_some() && self.selected_shipping().is_some(),
            CheckoutStep::Payment => self.selected_payment().is_some(),
            CheckoutStep::Review => false,
        }
    }

    /// The earliest step that still needs input.
    #[must_use]
    pub fn first_incomplete(&self) -> CheckoutStep {
        CheckoutStep::ALL
            .into_iter()
            .find(|step| !self.is_complete(*step))
            .unwrap_or(CheckoutStep::Review)
    }

    /// Check that a step may be entered.
    ///
    /// # Errors
    ///
    /// Returns the step to send the shopper to instead.
    pub fn gate(&self, step: CheckoutStep) -> Result<(), CheckoutStep> {
        let first = self.first_incomplete();
        if first < step { Err(first) } else { Ok(()) }
    }

    /// Forget shipping and payment choices after the cart changed.
    ///
    /// Returns `true` when anything was cleared.
    pub fn sync_cart(&mut self, signature: &str) -> bool {
        let changed = self
            .cart_signature
            .as_deref()
            .is_some_and(|previous| previous != signature);
        if changed {
            self.shipping_options.clear();
            self.clear_from_shipping_option();
        }
        self.cart_signature = Some(signature.to_string());
        changed
    }

    /// Record a new address with the options quoted for it.
    pub fn set_address(&mut self, address: ShippingAddress, options: Vec<ShippingOption>) {
        self.address = Some(address);
        self.shipping_options = options;
        self.clear_from_shipping_option();
    }

    /// Validate a shipping option id against the quoted options.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShippingOption` for an id that was not offered, or
    /// `Incomplete(Shipping)` when there is no address yet.
    pub fn check_shipping_option(&self, id: &ShippingOptionId) -> Result<(), WizardError> {
        if self.address.is_none() {
            return Err(WizardError::Incomplete(CheckoutStep::Shipping));
        }
        if self.shipping_options.iter().any(|option| &option.id == id) {
            Ok(())
        } else {
            Err(WizardError::UnknownShippingOption)
        }
    }

    /// Select a shipping option and the payment methods available for it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check_shipping_option`].
    pub fn choose_shipping_option(
        &mut self,
        id: ShippingOptionId,
        methods: Vec<PaymentMethod>,
    ) -> Result<(), WizardError> {
        self.check_shipping_option(&id)?;
        self.clear_from_shipping_option();
        self.shipping_option_id = Some(id);
        self.payment_methods = methods;
        Ok(())
    }

    /// Select a payment method.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPaymentMethod` for an id that was not offered.
    pub fn choose_payment_method(&mut self, id: PaymentMethodId) -> Result<(), WizardError> {
        if !self.payment_methods.iter().any(|method| method.id == id) {
            return Err(WizardError::UnknownPaymentMethod);
        }
        // Reconfirming the same method is still the same order
        if self.payment_method_id.as_ref() != Some(&id) {
            self.payment_method_id = Some(id);
            self.idempotency_key = None;
        }
        Ok(())
    }

    fn clear_from_shipping_option(&mut self) {
        self.shipping_option_id = None;
        self.payment_methods.clear();
        self.payment_method_id = None;
        self.idempotency_key = None;
    }

    #[must_use]
    pub fn selected_shipping(&self) -> Option<&ShippingOption> {
        let id = self.shipping_option_id.as_ref()?;
        self.shipping_options.iter().find(|option| &option.id == id)
    }

    #[must_use]
    pub fn selected_payment(&self) -> Option<&PaymentMethod> {
        let id = self.payment_method_id.as_ref()?;
        self.payment_methods.iter().find(|method| &method.id == id)
    }

    /// Key for the next submission, created on first use.
    pub fn idempotency_key(&mut self) -> Uuid {
        *self.idempotency_key.get_or_insert_with(Uuid::new_v4)
    }

    /// Cart subtotal plus shipping, when both are known and share a currency.
    #[must_use]
    pub fn total(&self, cart: &CartMirror) -> Option<Money> {
        let shipping = self.selected_shipping()?;
        cart.subtotal.checked_add(shipping.cost).ok()
    }

    /// The final payload for the backend.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` when there is nothing to buy, or `Incomplete` for
    /// the first missing step.
    pub fn build_request(&self, cart: &CartMirror) -> Result<CheckoutRequest, WizardError> {
        let cart_id = match &cart.cart_id {
            Some(id) if !cart.is_empty() => id.clone(),
            _ => return Err(WizardError::EmptyCart),
        };
        let (Some(address), Some(shipping)) = (&self.address, self.selected_shipping()) else {
            return Err(WizardError::Incomplete(CheckoutStep::Shipping));
        };
        let Some(payment) = self.selected_payment() else {
            return Err(WizardError::Incomplete(CheckoutStep::Payment));
        };

        Ok(CheckoutRequest {
            cart_id,
            shipping_address: address.clone(),
            shipping_option_id: shipping.id.clone(),
            payment_method_id: payment.id.clone(),
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
        })
    }
}

// =============================================================================
// Payment redirect validation
// =============================================================================

/// Why a payment redirect URL was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("payment URL is not a valid URL")]
    Invalid,

    #[error("payment URL must use https")]
    NotHttps,

    #[error("payment host {0} is not allowed")]
    HostNotAllowed(String),
}

/// Whether `host` matches an allow-list entry.
///
/// An entry starting with `.` matches the domain itself and any subdomain;
/// other entries must match exactly.
#[must_use]
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        match entry.strip_prefix('.') {
            Some(apex) => host == apex || host.ends_with(&entry),
            None => host == entry,
        }
    })
}

/// Check a provider redirect URL before sending the browser to it.
///
/// # Errors
///
/// Returns a [`RedirectError`] when the URL is malformed, not https, or
/// points at a host outside the allow-list.
pub fn validate_payment_redirect(raw: &str, allowed: &[String]) -> Result<Url, RedirectError> {
    let url = Url::parse(raw).map_err(|_| RedirectError::Invalid)?;
    if url.scheme() != "https" {
        return Err(RedirectError::NotHttps);
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(RedirectError::Invalid);
    }
    let host = url.host_str().ok_or(RedirectError::Invalid)?;
    if !host_allowed(host, allowed) {
        return Err(RedirectError::HostNotAllowed(host.to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use vitrina_core::{CartId, CurrencyCode};

    use super::*;
    use crate::backend::PaymentKind;
    use crate::config::DEFAULT_PAYMENT_REDIRECT_HOSTS;

    fn ars(amount: &str) -> Money {
        Money::new(
            Decimal::from_str(amount).unwrap_or_else(|e| panic!("{e}")),
            CurrencyCode::Ars,
        )
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ana".to_string(),
            last_name: "Pérez".to_string(),
            street: "Corrientes".to_string(),
            number: "1234".to_string(),
            city: "CABA".to_string(),
            state: "Buenos Aires".to_string(),
            postal_code: "C1043".to_string(),
            phone: "1122334455".to_string(),
            ..ShippingAddress::default()
        }
    }

    fn option(id: &str, cost: &str) -> ShippingOption {
        ShippingOption {
            id: ShippingOptionId::new(id),
            carrier: "Correo".to_string(),
            service: id.to_string(),
            cost: ars(cost),
            min_days: None,
            max_days: None,
        }
    }

    fn method(id: &str) -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(id),
            name: id.to_string(),
            kind: PaymentKind::MercadoPago,
            description: None,
        }
    }

    fn complete_wizard() -> CheckoutWizard {
        let mut wizard = CheckoutWizard::default();
        wizard.set_address(address(), vec![option("std", "1500"), option("exp", "3000")]);
        wizard
            .choose_shipping_option(ShippingOptionId::new("std"), vec![method("mp")])
            .unwrap_or_else(|e| panic!("{e}"));
        wizard
            .choose_payment_method(PaymentMethodId::new("mp"))
            .unwrap_or_else(|e| panic!("{e}"));
        wizard
    }

    fn cart(subtotal: &str) -> CartMirror {
        let mut cart = CartMirror {
            cart_id: Some(CartId::new("c1")),
            subtotal: ars(subtotal),
            item_count: 1,
            ..CartMirror::default()
        };
        cart.items.push(crate::backend::CartItem {
            id: vitrina_core::CartItemId::new("i1"),
            product_id: vitrina_core::ProductId::new("p1"),
            slug: "p1".to_string(),
            name: "P1".to_string(),
            image_url: None,
            unit_price: ars(subtotal),
            quantity: 1,
            line_total: ars(subtotal),
            stock: None,
        });
        cart
    }

    #[test]
    fn test_fresh_wizard_starts_at_shipping() {
        let wizard = CheckoutWizard::default();
        assert_eq!(wizard.first_incomplete(), CheckoutStep::Shipping);
        assert_eq!(wizard.gate(CheckoutStep::Shipping), Ok(()));
        assert_eq!(
            wizard.gate(CheckoutStep::Review),
            Err(CheckoutStep::Shipping)
        );
    }

    #[test]
    fn test_address_alone_does_not_complete_shipping() {
        let mut wizard = CheckoutWizard::default();
        wizard.set_address(address(), vec![option("std", "1500")]);
        assert!(!wizard.is_complete(CheckoutStep::Shipping));
        assert_eq!(
            wizard.gate(CheckoutStep::Payment),
            Err(CheckoutStep::Shipping)
        );
    }

    #[test]
    fn test_complete_wizard_reaches_review() {
        let wizard = complete_wizard();
        assert_eq!(wizard.first_incomplete(), CheckoutStep::Review);
        assert_eq!(wizard.gate(CheckoutStep::Review), Ok(()));
        assert_eq!(wizard.total(&cart("10000")), Some(ars("11500")));
    }

    #[test]
    fn test_unknown_selections_are_rejected() {
        let mut wizard = CheckoutWizard::default();
        assert_eq!(
            wizard.check_shipping_option(&ShippingOptionId::new("std")),
            Err(WizardError::Incomplete(CheckoutStep::Shipping))
        );

        wizard.set_address(address(), vec![option("std", "1500")]);
        assert_eq!(
            wizard.choose_shipping_option(ShippingOptionId::new("nope"), vec![]),
            Err(WizardError::UnknownShippingOption)
        );
        assert_eq!(
            wizard.choose_payment_method(PaymentMethodId::new("mp")),
            Err(WizardError::UnknownPaymentMethod)
        );
    }

    #[test]
    fn test_new_address_clears_later_choices() {
        let mut wizard = complete_wizard();
        let key = wizard.idempotency_key();
        wizard.set_address(address(), vec![option("std", "1800")]);

        assert!(wizard.shipping_option_id.is_none());
        assert!(wizard.payment_method_id.is_none());
        assert!(wizard.payment_methods.is_empty());
        assert_ne!(wizard.idempotency_key(), key);
    }

    #[test]
    fn test_new_shipping_option_clears_payment() {
        let mut wizard = complete_wizard();
        wizard
            .choose_shipping_option(ShippingOptionId::new("exp"), vec![method("transfer")])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(wizard.payment_method_id.is_none());
        assert_eq!(wizard.first_incomplete(), CheckoutStep::Payment);
    }

    #[test]
    fn test_cart_change_invalidates_selections_but_keeps_address() {
        let mut wizard = complete_wizard();
        assert!(!wizard.sync_cart("i1x1"));
        assert!(!wizard.sync_cart("i1x1"));
        assert!(wizard.sync_cart("i1x2"));

        assert!(wizard.address.is_some());
        assert!(wizard.shipping_option_id.is_none());
        assert!(wizard.shipping_options.is_empty());
        assert_eq!(wizard.first_incomplete(), CheckoutStep::Shipping);
    }

    #[test]
    fn test_idempotency_key_is_stable_until_reset() {
        let mut wizard = complete_wizard();
        let first = wizard.idempotency_key();
        assert_eq!(wizard.idempotency_key(), first);
    }

    #[test]
    fn test_payment_method_change_resets_key() {
        let mut wizard = complete_wizard();
        wizard.payment_methods.push(method("transfer"));
        let first = wizard.idempotency_key();

        wizard
            .choose_payment_method(PaymentMethodId::new("mp"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(wizard.idempotency_key(), first);

        wizard
            .choose_payment_method(PaymentMethodId::new("transfer"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_ne!(wizard.idempotency_key(), first);
    }

    #[test]
    fn test_build_request() {
        let mut wizard = complete_wizard();
        wizard.notes = Some("  ring twice ".to_string());
        let request = wizard
            .build_request(&cart("100"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.cart_id.as_str(), "c1");
        assert_eq!(request.shipping_option_id.as_str(), "std");
        assert_eq!(request.payment_method_id.as_str(), "mp");
        assert_eq!(request.notes.as_deref(), Some("ring twice"));

        assert_eq!(
            wizard.build_request(&CartMirror::default()),
            Err(WizardError::EmptyCart)
        );
        assert_eq!(
            CheckoutWizard::default().build_request(&cart("100")),
            Err(WizardError::Incomplete(CheckoutStep::Shipping))
        );
    }

    #[test]
    fn test_host_allow_list() {
        let allowed = vec![".mercadopago.com.ar".to_string(), "pay.example.com".to_string()];
        assert!(host_allowed("www.mercadopago.com.ar", &allowed));
        assert!(host_allowed("mercadopago.com.ar", &allowed));
        assert!(host_allowed("pay.example.com", &allowed));
        assert!(!host_allowed("evilmercadopago.com.ar", &allowed));
        assert!(!host_allowed("sub.pay.example.com", &allowed));
        assert!(!host_allowed("mercadopago.com.ar.evil.io", &allowed));
    }

    #[test]
    fn test_validate_payment_redirect() {
        let allowed: Vec<String> = DEFAULT_PAYMENT_REDIRECT_HOSTS
            .iter()
            .map(ToString::to_string)
            .collect();

        assert!(
            validate_payment_redirect(
                "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=123",
                &allowed
            )
            .is_ok()
        );
        assert_eq!(
            validate_payment_redirect("http://www.mercadopago.com.ar/x", &allowed),
            Err(RedirectError::NotHttps)
        );
        assert_eq!(
            validate_payment_redirect("https://evil.example/pay", &allowed),
            Err(RedirectError::HostNotAllowed("evil.example".to_string()))
        );
        assert_eq!(
            validate_payment_redirect("not a url", &allowed),
            Err(RedirectError::Invalid)
        );
        assert_eq!(
            validate_payment_redirect("https://user@www.mercadopago.com.ar/", &allowed),
            Err(RedirectError::Invalid)
        );
    }
}
