//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers and records for the storefront
//! domain.

pub mod address;
pub mod email;
pub mod id;
pub mod order;
pub mod payment;
pub mod price;
pub mod product;
pub mod status;
pub mod wishlist;

pub use address::{AddressError, SavedAddress, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderLine, OrderTotals};
pub use payment::PaymentMethod;
pub use price::Money;
pub use product::{Product, ProductError, ProductRecord};
pub use status::OrderStatus;
pub use wishlist::WishlistEntry;
