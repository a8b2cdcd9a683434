//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP built with the nonce)
//! 6. Session layer (tower-sessions with in-memory store)
//! 7. Session expiry (drop customers whose backend token was rejected)
//! 8. Rate limiting (governor), per route group

pub mod auth;
pub mod csp;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, clear_current_customer, is_local_path, safe_next_path,
    session_expiry_middleware, set_current_customer,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use page::{PageContext, set_flash, take_flash};
pub use rate_limit::{auth_rate_limiter, mutation_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
