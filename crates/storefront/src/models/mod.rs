//! Session-stored models.

pub mod session;

pub use session::{CurrentCustomer, Flash, FlashKind, session_keys};
