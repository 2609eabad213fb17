//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (REST backend)
//! - `BAZAAR_BACKEND_URL` - Base URL of the document-store gateway
//! - `BAZAAR_API_TOKEN` - Bearer token for the gateway (high entropy)
//!
//! ## Optional
//! - `BAZAAR_REQUEST_TIMEOUT_SECS` - Upper bound on every remote call (default: 10)
//! - `BAZAAR_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `BAZAAR_FREE_SHIPPING_THRESHOLD` - Subtotals above this ship free (default: 100.00)
//! - `BAZAAR_SHIPPING_FEE` - Flat fee below the threshold (default: 9.99)
//! - `BAZAAR_TAX_RATE` - Fraction of the subtotal charged as tax (default: 0)

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use bazaar_core::Money;

use crate::cart::{
    DEFAULT_FREE_SHIPPING_THRESHOLD, DEFAULT_SHIPPING_FEE, PricingError, PricingPolicy,
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

const MIN_API_TOKEN_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    #[error("Invalid pricing policy: {0}")]
    InvalidPricing(#[from] PricingError),
}

/// Storefront engine configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Document-store gateway settings
    pub backend: BackendConfig,
    /// Upper bound on every remote call
    pub request_timeout: Duration,
    /// Shipping and tax policy applied to carts and drafts
    pub pricing: PricingPolicy,
}

/// Document-store gateway configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Gateway base URL
    pub base_url: Url,
    /// Bearer token sent with every request
    pub api_token: SecretString,
    /// How long product reads stay cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = BackendConfig::from_lookup(&lookup)?;
        let request_timeout = Duration::from_secs(parse_or_default(
            &lookup,
            "BAZAAR_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_REQUEST_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let pricing = pricing_from_lookup(&lookup)?;

        Ok(Self {
            backend,
            request_timeout,
            pricing,
        })
    }
}

impl BackendConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = get_required(lookup, "BAZAAR_BACKEND_URL")?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BAZAAR_BACKEND_URL".to_string(), e.to_string())
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_BACKEND_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let api_token = get_validated_secret(lookup, "BAZAAR_API_TOKEN")?;
        let cache_ttl = Duration::from_secs(parse_or_default(
            lookup,
            "BAZAAR_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);

        Ok(Self {
            base_url,
            api_token,
            cache_ttl,
        })
    }
}

/// Load only the pricing policy from environment variables.
///
/// Offline tools that never reach the backend use this instead of
/// [`StorefrontConfig::from_env`].
///
/// # Errors
///
/// Returns `ConfigError` if a pricing variable is not a decimal or the
/// resulting policy is inconsistent.
pub fn pricing_from_env() -> Result<PricingPolicy, ConfigError> {
    let _ = dotenvy::dotenv();
    pricing_from_lookup(&|key: &str| std::env::var(key).ok())
}

fn pricing_from_lookup<F>(lookup: &F) -> Result<PricingPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let threshold: Decimal = parse_or_default(
        lookup,
        "BAZAAR_FREE_SHIPPING_THRESHOLD",
        DEFAULT_FREE_SHIPPING_THRESHOLD.amount(),
    )?;
    let fee: Decimal = parse_or_default(
        lookup,
        "BAZAAR_SHIPPING_FEE",
        DEFAULT_SHIPPING_FEE.amount(),
    )?;
    let tax_rate: Decimal = parse_or_default(lookup, "BAZAAR_TAX_RATE", Decimal::ZERO)?;

    Ok(PricingPolicy::new(Money::new(threshold), Money::new(fee), tax_rate)?)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable. Blank values count as missing.
fn get_required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
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

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is long enough, not a placeholder, and has
/// sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_API_TOKEN_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret.
fn get_validated_secret<F>(lookup: &F, key: &str) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_required(lookup, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;
    use secrecy::ExposeSecret;

    use super::*;

    const TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("BAZAAR_BACKEND_URL", "https://store.test/api/"),
            ("BAZAAR_API_TOKEN", TOKEN),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup_from(&minimal())).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.backend.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.pricing, PricingPolicy::default());
        assert_eq!(config.backend.api_token.expose_secret(), TOKEN);
    }

    #[test]
    fn test_overrides() {
        let mut vars = minimal();
        vars.push(("BAZAAR_TAX_RATE", "0.08"));
        vars.push(("BAZAAR_REQUEST_TIMEOUT_SECS", "3"));
        vars.push(("BAZAAR_SHIPPING_FEE", "4.50"));

        let config = StorefrontConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.pricing.tax_rate(), dec!(0.08));
        assert_eq!(config.pricing.shipping_fee(), Money::new(dec!(4.50)));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_url() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[("BAZAAR_API_TOKEN", TOKEN)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "BAZAAR_BACKEND_URL"));
    }

    #[test]
    fn test_invalid_numbers() {
        let mut vars = minimal();
        vars.push(("BAZAAR_REQUEST_TIMEOUT_SECS", "soon"));
        let err = StorefrontConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "BAZAAR_REQUEST_TIMEOUT_SECS"));

        let mut vars = minimal();
        vars.push(("BAZAAR_TAX_RATE", "8%"));
        let err = StorefrontConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "BAZAAR_TAX_RATE"));
    }

    #[test]
    fn test_inconsistent_pricing() {
        let mut vars = minimal();
        vars.push(("BAZAAR_TAX_RATE", "8"));
        let err = StorefrontConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPricing(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut vars = minimal();
        vars.push(("BAZAAR_REQUEST_TIMEOUT_SECS", "0"));
        assert!(StorefrontConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(TOKEN) > 3.3);
    }

    #[test]
    fn test_rejects_placeholder_token() {
        let err = validate_secret_strength("your-api-token-goes-right-here", "T").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, ref why) if why.contains("placeholder")));
    }

    #[test]
    fn test_rejects_low_entropy_token() {
        let err = validate_secret_strength(&"ab".repeat(20), "T").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, ref why) if why.contains("entropy")));
    }

    #[test]
    fn test_rejects_short_token() {
        assert!(validate_secret_strength("aB3$xY9!", "T").is_err());
        assert!(validate_secret_strength(TOKEN, "T").is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = StorefrontConfig::from_lookup(lookup_from(&minimal())).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("store.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(TOKEN));
    }
}
