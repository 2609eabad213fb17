//! Shipping addresses and the saved address book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AddressId, UserId};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank. Carries the field's display name.
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// A postal address an order can ship to.
///
/// Every field is required; [`ShippingAddress::validate`] reports the first
/// blank one in form order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    /// State or province.
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl ShippingAddress {
    /// Check that every required field is filled in.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::MissingField` naming the first blank field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("name", &self.full_name),
            ("street", &self.street),
            ("city", &self.city),
            ("region", &self.region),
            ("postal code", &self.postal_code),
            ("country", &self.country),
            ("phone", &self.phone),
        ];

        match fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(AddressError::MissingField(name)),
            None => Ok(()),
        }
    }

    /// Single-line summary, e.g. for order confirmations.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {} {}, {}",
            self.full_name, self.street, self.city, self.region, self.postal_code, self.country
        )
    }
}

/// An address stored in the user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
