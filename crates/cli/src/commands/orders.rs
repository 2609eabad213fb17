//! List a user's orders from the order store.

use tracing::info;

use bazaar_core::UserId;
use bazaar_storefront::backend::RestBackend;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::services::{OrderService, timed};

/// Print a user's orders, newest first.
///
/// # Errors
///
/// Returns an error if configuration is missing or the store call fails.
#[allow(clippy::print_stdout)]
pub async fn list(user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let backend = RestBackend::new(&config.backend, config.request_timeout)?;
    let user_id = UserId::new(user_id);

    let orders = timed(config.request_timeout, backend.list_by_user(&user_id)).await?;
    info!(user_id = %user_id, orders = orders.len(), "Fetched orders");

    for order in &orders {
        println!(
            "{}  {}  {:<10} {:>3} items  {:>10}",
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.id,
            order.status.to_string(),
            order.item_count(),
            order.totals.total.to_string()
        );
    }
    Ok(())
}
