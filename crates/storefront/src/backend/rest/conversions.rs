//! Wire documents exchanged with the gateway.
//!
//! Listings arrive wrapped as `{"documents": [...]}` and creates answer with
//! `{"id": "..."}`. Product documents are decoded as [`ProductRecord`] and
//! then checked against the product invariants, so a bad record is reported
//! as [`RemoteError::Malformed`] with the offending ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{Product, ProductId, ProductRecord, ShippingAddress, UserId};

use crate::backend::RemoteError;

/// A listing response.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub documents: Vec<T>,
}

/// Response to a create request.
#[derive(Debug, Deserialize)]
pub struct CreatedDocument {
    pub id: String,
}

/// Body of `POST /wishlist`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistDocument<'a> {
    pub user_id: &'a UserId,
    pub product_id: &'a ProductId,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /addresses`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddressDocument<'a> {
    pub user_id: &'a UserId,
    #[serde(flatten)]
    pub address: &'a ShippingAddress,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of `PUT /addresses/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdateDocument<'a> {
    #[serde(flatten)]
    pub address: &'a ShippingAddress,
    pub updated_at: DateTime<Utc>,
}

/// Convert a product document, enforcing the product invariants.
pub fn convert_product(record: ProductRecord) -> Result<Product, RemoteError> {
    let id = record.id.clone();
    Product::try_from(record)
        .map_err(|e| RemoteError::Malformed(format!("product {id}: {e}")))
}

/// Convert a product listing, skipping documents that violate invariants.
///
/// One bad document should not hide the rest of a category page.
pub fn convert_products(records: Vec<ProductRecord>) -> Vec<Product> {
    records
        .into_iter()
        .filter_map(|record| match convert_product(record) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed product document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Money, SavedAddress, WishlistEntry};
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_product_listing_skips_malformed() {
        let json = r#"{"documents": [
            {"id": "ok", "name": "Lamp", "price": "20.00", "originalPrice": "25.00",
             "category": "Home", "rating": "4.5", "reviews": 12, "inStock": true},
            {"id": "bad", "name": "Broken", "price": "20.00", "originalPrice": "5.00",
             "category": "Home"}
        ]}"#;
        let envelope: ListEnvelope<ProductRecord> = serde_json::from_str(json).unwrap();
        let products = convert_products(envelope.documents);

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price(), Money::new(dec!(20.00)));
        assert_eq!(products[0].discount_percent(), Some(20));
    }

    #[test]
    fn test_malformed_product_names_document() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"id": "p9", "name": "X", "price": "1.00", "category": "C", "rating": "7"}"#,
        )
        .unwrap();
        let err = convert_product(record).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed(ref m) if m.starts_with("product p9")));
    }

    #[test]
    fn test_empty_envelope() {
        let envelope: ListEnvelope<WishlistEntry> = serde_json::from_str("{}").unwrap();
        assert!(envelope.documents.is_empty());
    }

    #[test]
    fn test_new_address_document_is_flat() {
        let address = ShippingAddress {
            full_name: "Ada".to_string(),
            city: "London".to_string(),
            ..ShippingAddress::default()
        };
        let user = UserId::new("u1");
        let doc = NewAddressDocument {
            user_id: &user,
            address: &address,
            is_default: true,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["fullName"], "Ada");
        assert_eq!(value["isDefault"], true);
        assert_eq!(value["userId"], "u1");

        // The same document reads back as a saved address once it has an ID.
        let mut value = value;
        value["id"] = "a1".into();
        let saved: SavedAddress = serde_json::from_value(value).unwrap();
        assert_eq!(saved.address.city, "London");
    }
}
