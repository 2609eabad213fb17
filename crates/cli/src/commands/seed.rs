//! Seed the catalog from a YAML product manifest.
//!
//! The manifest is a list of product documents in the store's own shape:
//!
//! ```yaml
//! - id: wireless-headphones
//!   name: Wireless Headphones
//!   price: "89.99"
//!   originalPrice: "129.99"
//!   category: Electronics
//!   rating: "4.5"
//!   reviews: 128
//!   inStock: true
//! ```
//!
//! Every entry is validated before anything is uploaded, so a bad manifest
//! never leaves the catalog half-seeded.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{error, info};

use bazaar_core::{Product, ProductId, ProductRecord};
use bazaar_storefront::backend::RestBackend;
use bazaar_storefront::config::StorefrontConfig;

/// A manifest entry that cannot be uploaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("entry {index} ({id}): {reason}")]
    Invalid {
        index: usize,
        id: ProductId,
        reason: String,
    },
    #[error("entry {index}: duplicate product id {id}")]
    Duplicate { index: usize, id: ProductId },
}

/// Validate manifest records, returning the products or every problem found.
pub fn validate_manifest(records: Vec<ProductRecord>) -> Result<Vec<Product>, Vec<ManifestError>> {
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(records.len());
    let mut errors = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        let id = record.id.clone();
        if !seen.insert(id.clone()) {
            errors.push(ManifestError::Duplicate { index, id });
            continue;
        }
        match Product::try_from(record) {
            Ok(product) => products.push(product),
            Err(e) => errors.push(ManifestError::Invalid {
                index,
                id,
                reason: e.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Seed products from a YAML manifest.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, configuration is missing, or an upload fails.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %file_path, "Loading product manifest");

    // Read and validate the manifest before touching the store
    let content = super::read_file(file_path).await?;
    let records: Vec<ProductRecord> = serde_yaml::from_str(&content)?;
    info!(entries = records.len(), "Parsed manifest");

    let products = match validate_manifest(records) {
        Ok(products) => products,
        Err(errors) => {
            error!("Manifest validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    if dry_run {
        info!(products = products.len(), "Manifest is valid (dry run, nothing uploaded)");
        return Ok(());
    }

    let config = StorefrontConfig::from_env()?;
    let backend = RestBackend::new(&config.backend, config.request_timeout)?;

    for product in &products {
        backend.put_product(product).await?;
    }

    info!(products = products.len(), "Seeding complete");
    Ok(())
}
