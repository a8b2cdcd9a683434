//! Vitrina Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront and its tests:
//! - `types` - ids, emails, money, order/payment statuses, checkout steps
//! - `validation` - form validation producing per-field error messages
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no sessions. The REST backend owns every entity; these types
//! mirror its payloads and carry the few invariants enforced locally.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::FieldErrors;
