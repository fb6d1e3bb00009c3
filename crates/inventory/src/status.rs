//! Stock status badges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display severity for an item's stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    Normal,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out-of-stock",
            StockStatus::LowStock => "low-stock",
            StockStatus::Normal => "normal",
        }
    }

    /// True for anything that needs restocking attention.
    pub fn needs_attention(self) -> bool {
        !matches!(self, StockStatus::Normal)
    }
}

/// Classify a stock level against its minimum.
///
/// `current <= 0` is out of stock (negative balances included), anything up to
/// and including `min` is low, the rest is normal.
pub fn classify(current_stock_base: Decimal, min_stock_base: Decimal) -> StockStatus {
    if current_stock_base <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if current_stock_base <= min_stock_base {
        StockStatus::LowStock
    } else {
        StockStatus::Normal
    }
}
