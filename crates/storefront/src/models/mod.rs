//! Session-scoped domain models for the storefront.

pub mod session;
