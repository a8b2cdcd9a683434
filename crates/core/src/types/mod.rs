//! Core types for Vitrina.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod checkout;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use address::ShippingAddress;
pub use checkout::CheckoutStep;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use status::*;
