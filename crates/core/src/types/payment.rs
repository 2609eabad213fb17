//! Payment method selection at checkout.

use serde::{Deserialize, Serialize};

/// How the shopper intends to pay.
///
/// Payment capture is handled by the order store; the client only records
/// the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Credit or debit card.
    #[default]
    #[serde(rename = "card")]
    Card,
    #[serde(rename = "paypal")]
    PayPal,
    #[serde(rename = "apple")]
    ApplePay,
}

impl PaymentMethod {
    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Card => "Credit/Debit Card",
            Self::PayPal => "PayPal",
            Self::ApplePay => "Apple Pay",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::PayPal),
            "apple" => Ok(Self::ApplePay),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::ApplePay).unwrap(), "\"apple\"");
        assert_eq!("paypal".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayPal);
        assert!("cash".parse::<PaymentMethod>().is_err());
    }
}
