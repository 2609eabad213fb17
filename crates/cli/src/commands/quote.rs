//! Price a cart file offline.
//!
//! Uses the same pricing policy as the engine (`BAZAAR_FREE_SHIPPING_THRESHOLD`,
//! `BAZAAR_SHIPPING_FEE`, `BAZAAR_TAX_RATE`) and never contacts the store.
//!
//! ```yaml
//! items:
//!   - id: mug
//!     name: Mug
//!     price: "10.00"
//!     quantity: 2
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use bazaar_core::{Money, OrderTotals, Product, ProductId};
use bazaar_storefront::cart::{Cart, PricingPolicy};
use bazaar_storefront::config;

#[derive(Debug, Deserialize)]
struct CartFile {
    items: Vec<CartFileItem>,
}

#[derive(Debug, Deserialize)]
struct CartFileItem {
    id: ProductId,
    name: String,
    price: Decimal,
    quantity: u32,
}

/// Build a cart from a cart file.
fn build_cart(content: &str, policy: PricingPolicy) -> Result<Cart, Box<dyn std::error::Error>> {
    let file: CartFile = serde_yaml::from_str(content)?;
    let mut cart = Cart::new(policy);
    for item in file.items {
        let product = Product::new(item.id.clone(), item.name, "quote", Money::new(item.price))
            .map_err(|e| format!("item {}: {e}", item.id))?;
        cart.add_item(&product, item.quantity)
            .map_err(|e| format!("item {}: {e}", item.id))?;
    }
    Ok(cart)
}

#[allow(clippy::print_stdout)]
fn print_totals(cart: &Cart, totals: &OrderTotals) {
    for line in cart.lines() {
        println!(
            "{:>4} x {:<30} {:>10}",
            line.quantity(),
            line.name(),
            line.line_total().to_string()
        );
    }
    println!("{:<37} {:>10}", "Subtotal", totals.subtotal.to_string());
    println!("{:<37} {:>10}", "Shipping", totals.shipping.to_string());
    println!("{:<37} {:>10}", "Tax", totals.tax.to_string());
    println!("{:<37} {:>10}", "Total", totals.total.to_string());
}

/// Print cart totals for a cart file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an item is
/// invalid, or the pricing configuration is inconsistent.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let policy = config::pricing_from_env()?;
    let content = super::read_file(file_path).await?;
    let cart = build_cart(&content, policy)?;

    let totals = cart.totals();
    info!(items = cart.item_count(), total = %totals.total, "Quoted cart");
    print_totals(&cart, &totals);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_quote_merges_repeated_items() {
        let content = r#"
items:
  - id: mug
    name: Mug
    price: "10.00"
    quantity: 1
  - id: tea
    name: Tea
    price: "5.00"
    quantity: 1
  - id: mug
    name: Mug
    price: "10.00"
    quantity: 1
"#;
        let cart = build_cart(content, PricingPolicy::default()).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total(), Money::new(dec!(34.99)));
    }

    #[test]
    fn test_quote_rejects_zero_quantity() {
        let content = r#"
items:
  - id: mug
    name: Mug
    price: "10.00"
    quantity: 0
"#;
        let err = build_cart(content, PricingPolicy::default()).unwrap_err();
        assert!(err.to_string().starts_with("item mug"));
    }
}
