use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How a stock update is applied.
///
/// `Subtract` is the only mode that can fail on the floor-at-zero check;
/// `Add` is unconditional and is what cancel/refund use to restore stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustment {
    Add,
    Subtract,
    Set,
}

impl StockAdjustment {
    pub fn as_str(self) -> &'static str {
        match self {
            StockAdjustment::Add => "add",
            StockAdjustment::Subtract => "subtract",
            StockAdjustment::Set => "set",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub compare_price: Option<BigDecimal>,
    pub sku: String,
    pub barcode: Option<String>,
    pub stock_quantity: i32,
    pub category_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StockAvailability {
    pub available: bool,
    pub stock_quantity: i32,
}
