//! Base and purchase units.
//!
//! Stock and cost are always tracked in the item's base unit. Suppliers sell in
//! purchase units (a 5 kg sack, a 12-bottle case), so every item carries a
//! purchase → base multiplier.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{DomainError, DomainResult, ValueObject};

/// Physical dimension of a unit. Conversions only exist within one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "cl")]
    Centiliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "unidad")]
    Piece,
    #[serde(rename = "docena")]
    Dozen,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Milliliter => "ml",
            Unit::Centiliter => "cl",
            Unit::Liter => "l",
            Unit::Piece => "unidad",
            Unit::Dozen => "docena",
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Milligram | Unit::Gram | Unit::Kilogram | Unit::Ounce | Unit::Pound => {
                Dimension::Mass
            }
            Unit::Milliliter | Unit::Centiliter | Unit::Liter => Dimension::Volume,
            Unit::Piece | Unit::Dozen => Dimension::Count,
        }
    }

    /// Size of one of this unit in g, ml or pieces.
    fn reference_size(self) -> Decimal {
        match self {
            Unit::Milligram => Decimal::new(1, 3),
            Unit::Gram => Decimal::ONE,
            Unit::Kilogram => Decimal::from(1000),
            Unit::Ounce => Decimal::new(28_349_523_125, 9),
            Unit::Pound => Decimal::new(45_359_237, 5),
            Unit::Milliliter => Decimal::ONE,
            Unit::Centiliter => Decimal::TEN,
            Unit::Liter => Decimal::from(1000),
            Unit::Piece => Decimal::ONE,
            Unit::Dozen => Decimal::from(12),
        }
    }

    /// How many `target` units one of `self` is, or `None` across dimensions.
    pub fn factor_to(self, target: Unit) -> Option<Decimal> {
        if self.dimension() != target.dimension() {
            return None;
        }
        Some(self.reference_size() / target.reference_size())
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "mg" => Unit::Milligram,
            "g" | "gr" | "gramo" | "gramos" => Unit::Gram,
            "kg" => Unit::Kilogram,
            "oz" => Unit::Ounce,
            "lb" => Unit::Pound,
            "ml" => Unit::Milliliter,
            "cl" => Unit::Centiliter,
            "l" | "lt" | "litro" | "litros" => Unit::Liter,
            "unidad" | "unidades" | "u" | "pz" => Unit::Piece,
            "docena" => Unit::Dozen,
            other => return Err(DomainError::validation(format!("unknown unit '{other}'"))),
        };
        Ok(unit)
    }
}

/// Purchase unit → base unit conversion for one inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConversion {
    purchase_unit: Unit,
    base_unit: Unit,
    multiplier: Decimal,
}

impl UnitConversion {
    /// `multiplier` = base units per purchase unit; must be positive.
    pub fn new(purchase_unit: Unit, base_unit: Unit, multiplier: Decimal) -> DomainResult<Self> {
        if multiplier <= Decimal::ZERO {
            return Err(DomainError::validation(
                "purchase_to_base_multiplier must be positive",
            ));
        }
        Ok(Self {
            purchase_unit,
            base_unit,
            multiplier,
        })
    }

    /// Conversion implied by the units themselves (kg → g = 1000).
    pub fn standard(purchase_unit: Unit, base_unit: Unit) -> Option<Self> {
        let multiplier = purchase_unit.factor_to(base_unit)?;
        Some(Self {
            purchase_unit,
            base_unit,
            multiplier,
        })
    }

    pub fn purchase_unit(&self) -> Unit {
        self.purchase_unit
    }

    pub fn base_unit(&self) -> Unit {
        self.base_unit
    }

    pub fn multiplier(&self) -> Decimal {
        self.multiplier
    }

    /// Conversions saturate at the `Decimal` range.
    pub fn to_base(&self, purchase_qty: Decimal) -> Decimal {
        purchase_qty.saturating_mul(self.multiplier)
    }

    pub fn to_purchase(&self, base_qty: Decimal) -> Decimal {
        self.divide(base_qty)
    }

    /// Cost of one base unit given the price of one purchase unit.
    pub fn cost_per_base_unit(&self, price_per_purchase_unit: Decimal) -> Decimal {
        self.divide(price_per_purchase_unit)
    }

    fn divide(&self, amount: Decimal) -> Decimal {
        match amount.checked_div(self.multiplier) {
            Some(result) => result,
            None if amount.is_sign_negative() => Decimal::MIN,
            None => Decimal::MAX,
        }
    }
}

impl ValueObject for UnitConversion {}
