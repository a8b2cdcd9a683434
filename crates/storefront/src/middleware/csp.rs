//! Content Security Policy: per-request nonce and policy builder.
//!
//! The nonce goes into `<script nonce="...">` tags and the CSP header. The
//! policy also has to let checkout forms end in a redirect to the payment
//! provider, since browsers apply `form-action` to redirects after a form
//! submission.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// A CSP nonce value for inline scripts.
///
/// Each request gets a unique, cryptographically random nonce (128-bit, base64-encoded).
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Generate a new random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// Get the nonce value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Middleware that generates a CSP nonce and stores it in request extensions.
///
/// Must run before `security_headers_middleware` so the nonce is available
/// when building the CSP header.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSP nonce not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// `form-action` sources for the payment redirect allow-list.
///
/// `.mercadopago.com.ar` allows the apex and every subdomain; a bare host
/// allows only itself.
#[must_use]
pub fn form_action_sources(hosts: &[String]) -> String {
    let mut sources = vec!["'self'".to_string()];
    for host in hosts {
        match host.strip_prefix('.') {
            Some(apex) => {
                sources.push(format!("https://{apex}"));
                sources.push(format!("https://*.{apex}"));
            }
            None => sources.push(format!("https://{host}")),
        }
    }
    sources.join(" ")
}

/// Build the full policy for one response.
///
/// Product images come from the backend's CDN, so `img-src` allows any
/// https origin.
#[must_use]
pub fn build_policy(nonce: Option<&str>, form_action: &str, secure: bool) -> String {
    let script_src = match nonce {
        Some(nonce) if !nonce.is_empty() => format!("'self' 'nonce-{nonce}'"),
        _ => "'self'".to_string(),
    };

    let mut policy = format!(
        "default-src 'none'; \
         script-src {script_src}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' https: data:; \
         connect-src 'self'; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action {form_action}; \
         frame-ancestors 'none'"
    );
    if secure {
        policy.push_str("; upgrade-insecure-requests");
    }
    policy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        assert_ne!(CspNonce::generate().0, CspNonce::generate().0);
        assert_eq!(CspNonce::generate().value().len(), 24);
    }

    #[test]
    fn test_form_action_sources() {
        let hosts = vec![
            ".mercadopago.com.ar".to_string(),
            "pay.example.com".to_string(),
        ];
        assert_eq!(
            form_action_sources(&hosts),
            "'self' https://mercadopago.com.ar https://*.mercadopago.com.ar https://pay.example.com"
        );
    }

    #[test]
    fn test_policy_includes_nonce_and_hosts() {
        let policy = build_policy(Some("abc"), "'self' https://*.mercadopago.com", true);
        assert!(policy.contains("script-src 'self' 'nonce-abc';"));
        assert!(policy.contains("form-action 'self' https://*.mercadopago.com;"));
        assert!(policy.ends_with("upgrade-insecure-requests"));
    }

    #[test]
    fn test_policy_without_nonce_over_http() {
        let policy = build_policy(None, "'self'", false);
        assert!(policy.contains("script-src 'self';"));
        assert!(!policy.contains("upgrade-insecure-requests"));
    }
}
