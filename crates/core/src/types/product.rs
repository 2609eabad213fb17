//! Catalog product records.
//!
//! Products are owned by the catalog store and are immutable from the
//! client's point of view. [`Product`] can only be built through validation,
//! either with [`Product::new`] or by deserializing a [`ProductRecord`].

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Money;

/// Highest rating a product can carry.
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Errors that can occur when constructing a [`Product`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product name is blank.
    #[error("product name cannot be empty")]
    EmptyName,
    /// The unit price is below zero.
    #[error("price cannot be negative")]
    NegativePrice,
    /// The original (list) price is below the selling price.
    #[error("original price {original} is below price {price}")]
    OriginalBelowPrice {
        /// Selling price.
        price: Money,
        /// Original price.
        original: Money,
    },
    /// Rating outside of 0-5.
    #[error("rating must be between 0 and 5 (got {0})")]
    RatingOutOfRange(Decimal),
}

/// Serialized shape of a product document.
///
/// Field names follow the document store's camelCase convention. Missing
/// optional fields fall back to catalog defaults: no original price means
/// "not discounted", no rating means unrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    pub category: String,
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_in_stock() -> bool {
    true
}

/// A product in the catalog.
///
/// ## Constraints
///
/// - Name is not blank
/// - Price is non-negative
/// - Original price is at least the price
/// - Rating is between 0 and 5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProductRecord", into = "ProductRecord")]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    original_price: Money,
    category: String,
    rating: Decimal,
    review_count: u32,
    in_stock: bool,
    description: Option<String>,
    image_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create an in-stock, unrated, undiscounted product.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the price is negative.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
    ) -> Result<Self, ProductError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if price.is_negative() {
            return Err(ProductError::NegativePrice);
        }

        Ok(Self {
            id: id.into(),
            name,
            price,
            original_price: price,
            category: category.into(),
            rating: Decimal::ZERO,
            review_count: 0,
            in_stock: true,
            description: None,
            image_url: None,
            created_at: None,
        })
    }

    /// Set the original (pre-discount) price.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::OriginalBelowPrice` if `original` is below the
    /// selling price.
    pub fn with_original_price(mut self, original: Money) -> Result<Self, ProductError> {
        if original < self.price {
            return Err(ProductError::OriginalBelowPrice {
                price: self.price,
                original,
            });
        }
        self.original_price = original;
        Ok(self)
    }

    /// Set the average rating and number of reviews.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::RatingOutOfRange` if the rating is not in 0-5.
    pub fn with_rating(mut self, rating: Decimal, review_count: u32) -> Result<Self, ProductError> {
        if rating < Decimal::ZERO || rating > MAX_RATING {
            return Err(ProductError::RatingOutOfRange(rating));
        }
        self.rating = rating;
        self.review_count = review_count;
        Ok(self)
    }

    /// Set the stock flag.
    #[must_use]
    pub const fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Set the long-form description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Set the catalog creation timestamp.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current selling price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// List price before discount. Equal to [`Product::price`] when the
    /// product is not discounted.
    #[must_use]
    pub const fn original_price(&self) -> Money {
        self.original_price
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub const fn rating(&self) -> Decimal {
        self.rating
    }

    #[must_use]
    pub const fn review_count(&self) -> u32 {
        self.review_count
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.in_stock
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Whole-percent discount off the original price, if any.
    ///
    /// Rounded to the nearest percent, e.g. 89.99 from 129.99 is 31% off.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price.amount();
        let price = self.price.amount();
        if original <= price || original.is_zero() {
            return None;
        }

        let percent = ((original - price) / original * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        percent.to_u32().filter(|p| *p > 0)
    }
}

impl TryFrom<ProductRecord> for Product {
    type Error = ProductError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let price = Money::new(record.price);
        let mut product = Self::new(record.id, record.name, record.category, price)?
            .with_original_price(record.original_price.map_or(price, Money::new))?
            .with_rating(record.rating, record.reviews)?
            .with_stock(record.in_stock);
        product.description = record.description;
        product.image_url = record.image;
        product.created_at = record.created_at;
        Ok(product)
    }
}

impl From<Product> for ProductRecord {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price.amount(),
            original_price: Some(product.original_price.amount()),
            category: product.category,
            rating: product.rating,
            reviews: product.review_count,
            in_stock: product.in_stock,
            description: product.description,
            image: product.image_url,
            created_at: product.created_at,
        }
    }
}
