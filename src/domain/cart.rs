use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Upper bound on the quantity of a single product in one cart.
pub const MAX_QUANTITY_PER_LINE: i32 = 100;

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub lines: Vec<CartLineView>,
    pub subtotal: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    pub fn total_items(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of the non-mutating pre-flight check before checkout. Stock can
/// drift between add-to-cart and checkout, so callers must not trust a stale
/// cart without re-validating.
#[derive(Debug, Clone)]
pub struct CheckoutValidation {
    pub is_valid: bool,
    pub message: String,
}

impl CheckoutValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}
