//! Order drafts and submission.
//!
//! Checkout is split in two steps so that a failed submission never loses
//! the shopper's work:
//!
//! - [`Checkout::build_draft`] validates the cart and address, re-checks each
//!   product against the catalog and freezes an immutable [`OrderDraft`]
//! - [`Checkout::submit`] hands the draft to the order store; the draft is
//!   only borrowed and can be resubmitted after a failure
//!
//! Submission is not idempotent. Resubmitting after an ambiguous failure
//! (e.g. a timeout after the store committed) can create a second order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{
    AddressError, Order, OrderId, OrderLine, OrderStatus, OrderTotals, PaymentMethod, ProductId,
    ShippingAddress, UserId,
};

use crate::backend::RemoteError;
use crate::cart::{CartLine, PricingPolicy};
use crate::error::ErrorKind;
use crate::services::{CatalogService, OrderService, timed};

/// Errors that can occur while building or submitting an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// A cart line refers to a product that no longer exists.
    #[error("product {0} no longer exists")]
    ProductNotFound(ProductId),

    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),

    #[error("order store error: {0}")]
    Remote(#[from] RemoteError),

    /// `resubmit` was called with nothing pending.
    #[error("no order is awaiting submission")]
    NoPendingDraft,
}

impl CheckoutError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyCart | Self::InvalidAddress(_) | Self::NoPendingDraft => {
                ErrorKind::Validation
            }
            Self::ProductNotFound(_) | Self::OutOfStock(_) => ErrorKind::NotFound,
            Self::Remote(e) => e.kind(),
        }
    }
}

/// An immutable order summary, ready for submission.
///
/// Prices are frozen from the cart lines; totals are computed once with the
/// checkout's pricing policy and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    user_id: UserId,
    lines: Vec<OrderLine>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    #[serde(flatten)]
    totals: OrderTotals,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl OrderDraft {
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    #[must_use]
    pub const fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    #[must_use]
    pub const fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    #[must_use]
    pub const fn total(&self) -> bazaar_core::Money {
        self.totals.total
    }

    /// Always [`OrderStatus::Pending`].
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The order record a store persists for this draft.
    #[must_use]
    pub fn to_order(&self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id.clone(),
            lines: self.lines.clone(),
            shipping_address: self.shipping_address.clone(),
            payment_method: self.payment_method,
            totals: self.totals,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Builds and submits orders against the catalog and order store.
#[derive(Clone)]
pub struct Checkout {
    catalog: Arc<dyn CatalogService>,
    orders: Arc<dyn OrderService>,
    policy: PricingPolicy,
    timeout: Duration,
}

impl Checkout {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        orders: Arc<dyn OrderService>,
        policy: PricingPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            orders,
            policy,
            timeout,
        }
    }

    /// Freeze cart lines, an address and a payment method into a draft.
    ///
    /// The lines and address are validated before any network call. Each
    /// product is then re-read from the catalog, bypassing caches, to make
    /// sure it still exists and is in stock.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` if `lines` is empty
    /// - `InvalidAddress` naming the first missing address field
    /// - `ProductNotFound` / `OutOfStock` for the first failing line
    /// - `Remote` if a catalog lookup fails or times out
    #[instrument(skip_all, fields(user_id = %user_id, lines = lines.len()))]
    pub async fn build_draft(
        &self,
        user_id: &UserId,
        lines: &[CartLine],
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<OrderDraft, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        address.validate()?;

        for line in lines {
            let product_id = line.product_id();
            let product = match timed(self.timeout, self.catalog.refresh_product(product_id)).await
            {
                Ok(Some(product)) => product,
                Ok(None) => return Err(CheckoutError::ProductNotFound(product_id.clone())),
                Err(e) if e.is_not_found() => {
                    return Err(CheckoutError::ProductNotFound(product_id.clone()));
                }
                Err(e) => return Err(e.into()),
            };
            if !product.in_stock() {
                tracing::info!(product_id = %product_id, "Checkout blocked by out-of-stock product");
                return Err(CheckoutError::OutOfStock(product_id.clone()));
            }
        }

        let lines: Vec<OrderLine> = lines.iter().map(CartLine::to_order_line).collect();
        let subtotal = lines.iter().map(OrderLine::line_total).sum();

        Ok(OrderDraft {
            user_id: user_id.clone(),
            lines,
            shipping_address: address.clone(),
            payment_method,
            totals: self.policy.totals_for(subtotal),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Submit a draft to the order store.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Remote` if the store rejects the order or the
    /// call times out. The draft is untouched and may be resubmitted.
    #[instrument(skip_all, fields(user_id = %draft.user_id(), total = %draft.total()))]
    pub async fn submit(&self, draft: &OrderDraft) -> Result<OrderId, CheckoutError> {
        match timed(self.timeout, self.orders.create(draft)).await {
            Ok(order_id) => {
                tracing::info!(order_id = %order_id, "Order submitted");
                Ok(order_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Order submission failed");
                Err(e.into())
            }
        }
    }
}
