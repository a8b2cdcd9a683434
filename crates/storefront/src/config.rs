//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_API_URL` - Base URL of the shop REST API (e.g. `https://api.example.com/v1/`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_NAME` - Name shown in page titles (default: Vitrina)
//! - `BACKEND_API_KEY` - Server-to-server API key sent as `X-Api-Key`
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - Product/category cache TTL (default: 300)
//! - `PRODUCTS_PER_PAGE` - Listing page size (default: 12)
//! - `PAYMENT_REDIRECT_HOSTS` - Comma-separated hosts checkout may redirect to
//!   (default: Mercado Pago domains; a leading `.` matches subdomains)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for human-readable

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Hosts Mercado Pago sends buyers to. A leading `.` matches any subdomain.
pub const DEFAULT_PAYMENT_REDIRECT_HOSTS: &[&str] = &[
    ".mercadopago.com",
    ".mercadopago.com.ar",
    ".mercadopago.com.br",
    ".mercadopago.com.mx",
    ".mercadopago.cl",
    ".mercadopago.com.co",
    ".mercadopago.com.pe",
    ".mercadopago.com.uy",
    ".mercadolibre.com",
];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Store name used in page titles
    pub store_name: String,
    /// Shop REST API configuration
    pub backend: BackendConfig,
    /// Listing page size
    pub products_per_page: u32,
    /// Hosts the checkout may redirect buyers to
    pub payment_redirect_hosts: Vec<String>,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
    /// Emit JSON logs
    pub json_logs: bool,
}

/// Shop REST API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, always ending with `/` so endpoint paths join under it
    pub base_url: Url,
    /// Optional server-to-server API key
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// TTL for cached catalog responses
    pub catalog_cache_ttl: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment name (production, staging, ...)
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance transaction sample rate
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let products_per_page: u32 = parse_env("PRODUCTS_PER_PAGE", "12")?;
        if products_per_page == 0 || products_per_page > 100 {
            return Err(ConfigError::InvalidEnvVar(
                "PRODUCTS_PER_PAGE".to_string(),
                "must be between 1 and 100".to_string(),
            ));
        }

        let payment_redirect_hosts = get_optional_env("PAYMENT_REDIRECT_HOSTS").map_or_else(
            || {
                DEFAULT_PAYMENT_REDIRECT_HOSTS
                    .iter()
                    .map(|h| (*h).to_string())
                    .collect()
            },
            |raw| parse_host_list(&raw),
        );

        Ok(Self {
            host,
            port,
            base_url,
            store_name: get_env_or_default("STORE_NAME", "Vitrina"),
            backend: BackendConfig::from_env()?,
            products_per_page,
            payment_redirect_hosts,
            sentry: SentryConfig::from_env()?,
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("BACKEND_API_URL")?;
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_API_URL".to_string(), e))?;

        let api_key = match get_optional_env("BACKEND_API_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "BACKEND_API_KEY")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(parse_env("BACKEND_TIMEOUT_SECS", "10")?),
            catalog_cache_ttl: Duration::from_secs(parse_env("CATALOG_CACHE_TTL_SECS", "300")?),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend base URL, forcing a trailing slash so relative endpoint
/// paths are joined beneath it rather than replacing its last segment.
///
/// # Errors
///
/// Returns a message if the URL is malformed or not http(s).
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Split a comma-separated host list, lowercasing and dropping blanks.
fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Expose the API key for the `X-Api-Key` header.
#[must_use]
pub fn api_key_header_value(config: &BackendConfig) -> Option<&str> {
    config.api_key.as_ref().map(|key| key.expose_secret())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            store_name: "Vitrina".to_string(),
            backend: BackendConfig {
                base_url: parse_base_url("http://localhost:8080/api").unwrap(),
                api_key: Some(SecretString::from("k3y-Zr9!pQ2@xL7#mN4")),
                timeout: Duration::from_secs(10),
                catalog_cache_ttl: Duration::from_secs(300),
            },
            products_per_page: 12,
            payment_redirect_hosts: vec![".mercadopago.com.ar".to_string()],
            sentry: SentryConfig::default(),
            json_logs: false,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://api.tienda.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.tienda.com/v1/");
        assert_eq!(
            url.join("products").unwrap().as_str(),
            "https://api.tienda.com/v1/products"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://api.tienda.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_host_list() {
        assert_eq!(
            parse_host_list(" .MercadoPago.com.ar, ,pay.example.org "),
            vec![".mercadopago.com.ar".to_string(), "pay.example.org".to_string()]
        );
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let mut config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());

        config.base_url = "https://tienda.com".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_backend_config_debug_redacts_api_key() {
        let config = test_config();
        let debug_output = format!("{:?}", config.backend);

        assert!(debug_output.contains("localhost:8080"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k3y-Zr9"));
        assert_eq!(api_key_header_value(&config.backend), Some("k3y-Zr9!pQ2@xL7#mN4"));
    }
}
