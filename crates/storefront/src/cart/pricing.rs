//! Shipping and tax policy.
//!
//! One policy is applied to both the live cart and order drafts so that the
//! total shown in the cart is the total submitted at checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{Money, OrderTotals};

/// Subtotals strictly above this ship free.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Money = Money::new(Decimal::from_parts(10000, 0, 0, false, 2));

/// Flat shipping fee below the threshold.
pub const DEFAULT_SHIPPING_FEE: Money = Money::new(Decimal::from_parts(999, 0, 0, false, 2));

/// Errors for an inconsistent pricing policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error("tax rate must be between 0 and 1 (got {0})")]
    TaxRateOutOfRange(Decimal),
}

/// Canonical fee policy.
///
/// - shipping is zero when the subtotal is strictly greater than
///   `free_shipping_threshold`, otherwise `shipping_fee`
/// - tax is `subtotal × tax_rate`, rounded to cents
/// - total is `subtotal + shipping + tax`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    free_shipping_threshold: Money,
    shipping_fee: Money,
    tax_rate: Decimal,
}

impl Default for PricingPolicy {
    /// Free shipping over $100.00, $9.99 otherwise, no tax.
    fn default() -> Self {
        Self {
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
            shipping_fee: DEFAULT_SHIPPING_FEE,
            tax_rate: Decimal::ZERO,
        }
    }
}

impl PricingPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns `PricingError` if an amount is negative or the tax rate is
    /// outside 0-1.
    pub fn new(
        free_shipping_threshold: Money,
        shipping_fee: Money,
        tax_rate: Decimal,
    ) -> Result<Self, PricingError> {
        if free_shipping_threshold.is_negative() {
            return Err(PricingError::Negative("free shipping threshold"));
        }
        if shipping_fee.is_negative() {
            return Err(PricingError::Negative("shipping fee"));
        }
        if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
            return Err(PricingError::TaxRateOutOfRange(tax_rate));
        }

        Ok(Self {
            free_shipping_threshold,
            shipping_fee,
            tax_rate,
        })
    }

    /// The default policy with a different tax rate.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::TaxRateOutOfRange` if the rate is outside 0-1.
    pub fn with_tax_rate(self, tax_rate: Decimal) -> Result<Self, PricingError> {
        Self::new(self.free_shipping_threshold, self.shipping_fee, tax_rate)
    }

    #[must_use]
    pub const fn free_shipping_threshold(&self) -> Money {
        self.free_shipping_threshold
    }

    #[must_use]
    pub const fn shipping_fee(&self) -> Money {
        self.shipping_fee
    }

    #[must_use]
    pub const fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    #[must_use]
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.shipping_fee
        }
    }

    #[must_use]
    pub fn tax_for(&self, subtotal: Money) -> Money {
        subtotal.percent(self.tax_rate)
    }

    #[must_use]
    pub fn totals_for(&self, subtotal: Money) -> OrderTotals {
        let shipping = self.shipping_for(subtotal);
        let tax = self.tax_for(subtotal);
        OrderTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_default_constants() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.free_shipping_threshold(), Money::new(dec!(100.00)));
        assert_eq!(policy.shipping_fee(), Money::new(dec!(9.99)));
        assert_eq!(policy.tax_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(Money::new(dec!(100.00))), Money::new(dec!(9.99)));
        assert_eq!(policy.shipping_for(Money::new(dec!(100.01))), Money::ZERO);
        assert_eq!(policy.shipping_for(Money::ZERO), Money::new(dec!(9.99)));
    }

    #[test]
    fn test_totals_with_tax() {
        let policy = PricingPolicy::default().with_tax_rate(dec!(0.08)).unwrap();
        let totals = policy.totals_for(Money::new(dec!(25.00)));
        assert_eq!(totals.tax, Money::new(dec!(2.00)));
        assert_eq!(totals.total, Money::new(dec!(36.99)));
    }

    #[test]
    fn test_rejects_invalid_policy() {
        assert_eq!(
            PricingPolicy::new(Money::new(dec!(-1)), DEFAULT_SHIPPING_FEE, Decimal::ZERO),
            Err(PricingError::Negative("free shipping threshold"))
        );
        assert_eq!(
            PricingPolicy::default().with_tax_rate(dec!(1.5)),
            Err(PricingError::TaxRateOutOfRange(dec!(1.5)))
        );
    }
}
