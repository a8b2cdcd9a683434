//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session-mirrored cart with optimistic updates
//! - `checkout` - Checkout wizard state and payment redirect checks

pub mod cart;
pub mod checkout;

pub use cart::{CartMirror, CartOp, CartService, MutationOutcome};
pub use checkout::{CheckoutWizard, RedirectError, WizardError, validate_payment_redirect};
