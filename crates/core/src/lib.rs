//! Bazaar Core - Shared domain types.
//!
//! This crate provides the record types used across all Bazaar components:
//! - `storefront` - Cart, wishlist and checkout engine
//! - `cli` - Catalog seeding and operator tools
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no async runtime. This keeps it lightweight and allows it to be
//! embedded anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, products, addresses, orders and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
