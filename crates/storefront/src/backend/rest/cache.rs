//! Cache types for catalog reads.

use bazaar_core::{Product, ProductId};

use crate::services::FeedCursor;

/// Cache key for product lookups and listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Category { name: String, limit: usize },
    Recent {
        limit: usize,
        after: Option<FeedCursor>,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}
