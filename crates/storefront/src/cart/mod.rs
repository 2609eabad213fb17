//! The shopping cart.
//!
//! A cart is an ordered list of lines, one per product. Each line freezes
//! the product's name and unit price at the moment it was first added, so
//! totals are a pure function of the lines and never touch the network.
//!
//! The cart lives in the user's [`Session`](crate::session::Session) and is
//! not persisted: every session starts with an empty cart.

mod pricing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{Money, OrderLine, OrderTotals, Product, ProductId};

pub use pricing::{
    DEFAULT_FREE_SHIPPING_THRESHOLD, DEFAULT_SHIPPING_FEE, PricingError, PricingPolicy,
};

/// Errors reported by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Adding zero units is not a meaningful change.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The product has no line in the cart.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),
}

/// One product and how many units of it the shopper wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    product_id: ProductId,
    name: String,
    unit_price: Money,
    quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price frozen when the line was created.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Always at least 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Snapshot this line for an order.
    #[must_use]
    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

/// A shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    policy: PricingPolicy,
}

impl Cart {
    /// Create an empty cart priced with `policy`.
    #[must_use]
    pub const fn new(policy: PricingPolicy) -> Self {
        Self {
            lines: Vec::new(),
            policy,
        }
    }

    /// A one-line cart for the "buy now" flow, which skips the session cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is zero.
    pub fn buy_now(
        policy: PricingPolicy,
        product: &Product,
        quantity: u32,
    ) -> Result<Self, CartError> {
        let mut cart = Self::new(policy);
        cart.add_item(product, quantity)?;
        Ok(cart)
    }

    /// Add `quantity` units of `product`.
    ///
    /// If the product already has a line its quantity is incremented
    /// (saturating at `u32::MAX`) and its frozen price is kept; otherwise a
    /// new line is appended.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is zero.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self.line_mut(product.id()) {
            line.quantity = line.quantity.saturating_add(quantity);
            tracing::debug!(product_id = %product.id(), quantity = line.quantity, "Cart line incremented");
        } else {
            self.lines.push(CartLine {
                product_id: product.id().clone(),
                name: product.name().to_owned(),
                unit_price: product.price(),
                quantity,
            });
            tracing::debug!(product_id = %product.id(), quantity, "Cart line added");
        }
        Ok(())
    }

    /// Set a line's quantity exactly. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product has no line; the
    /// cart is left unchanged.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return if self.remove_item(product_id) {
                Ok(())
            } else {
                Err(CartError::LineNotFound(product_id.clone()))
            };
        }

        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CartError::LineNotFound(product_id.clone()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        before != self.lines.len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Take placed order lines out of the cart.
    ///
    /// Each ordered quantity is subtracted from the matching line and lines
    /// that reach zero are dropped. Products added or incremented after the
    /// order was drafted stay in the cart.
    pub fn remove_ordered(&mut self, ordered: &[OrderLine]) {
        for placed in ordered {
            if let Some(line) = self.line_mut(&placed.product_id) {
                line.quantity = line.quantity.saturating_sub(placed.quantity);
            }
        }
        self.lines.retain(|line| line.quantity > 0);
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub const fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn shipping_fee(&self) -> Money {
        self.policy.shipping_for(self.subtotal())
    }

    #[must_use]
    pub fn tax(&self) -> Money {
        self.policy.tax_for(self.subtotal())
    }

    #[must_use]
    pub fn total(&self) -> Money {
        self.totals().total
    }

    /// Subtotal, shipping, tax and total in one pass.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        self.policy.totals_for(self.subtotal())
    }
}
