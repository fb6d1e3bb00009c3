//! Option groups attached to a menu item ("size", "extras", "milk").
//!
//! A specification is either single-select (pick at most one, or exactly one when
//! required) or multi-select with explicit bounds. Each option may change the
//! selling price.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{DomainError, DomainResult, ValueObject};

macro_rules! string_key {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(String);

        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_key!(
    /// Key of a specification within one menu item.
    SpecificationId
);
string_key!(
    /// Key of an option within one specification.
    OptionId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOption {
    pub id: OptionId,
    pub name: String,
    pub price_modifier: Decimal,
}

impl SpecOption {
    pub fn new(id: impl Into<OptionId>, name: impl Into<String>, price_modifier: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_modifier,
        }
    }
}

impl ValueObject for SpecOption {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Specification {
    SingleSelect {
        id: SpecificationId,
        name: String,
        required: bool,
        options: Vec<SpecOption>,
    },
    MultiSelect {
        id: SpecificationId,
        name: String,
        min_selections: u32,
        max_selections: u32,
        options: Vec<SpecOption>,
    },
}

impl ValueObject for Specification {}

impl Specification {
    pub fn id(&self) -> &SpecificationId {
        match self {
            Specification::SingleSelect { id, .. } | Specification::MultiSelect { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Specification::SingleSelect { name, .. } | Specification::MultiSelect { name, .. } => {
                name
            }
        }
    }

    pub fn options(&self) -> &[SpecOption] {
        match self {
            Specification::SingleSelect { options, .. }
            | Specification::MultiSelect { options, .. } => options,
        }
    }

    pub fn option(&self, option_id: &OptionId) -> Option<&SpecOption> {
        self.options().iter().find(|o| &o.id == option_id)
    }

    pub fn min_selections(&self) -> u32 {
        match self {
            Specification::SingleSelect { required, .. } => u32::from(*required),
            Specification::MultiSelect { min_selections, .. } => *min_selections,
        }
    }

    pub fn max_selections(&self) -> u32 {
        match self {
            Specification::SingleSelect { .. } => 1,
            Specification::MultiSelect { max_selections, .. } => *max_selections,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.id().as_str().trim().is_empty() {
            return Err(DomainError::validation("specification id cannot be empty"));
        }
        if self.name().trim().is_empty() {
            return Err(DomainError::validation(format!(
                "specification '{}' needs a name",
                self.id()
            )));
        }

        let options = self.options();
        if options.is_empty() {
            return Err(DomainError::validation(format!(
                "specification '{}' has no options",
                self.id()
            )));
        }

        let mut seen = HashSet::new();
        for option in options {
            if option.id.as_str().trim().is_empty() {
                return Err(DomainError::validation("option id cannot be empty"));
            }
            if !seen.insert(&option.id) {
                return Err(DomainError::validation(format!(
                    "duplicate option '{}' in specification '{}'",
                    option.id,
                    self.id()
                )));
            }
        }

        let (min, max) = (self.min_selections(), self.max_selections());
        if min > max || max as usize > options.len() || max == 0 {
            return Err(DomainError::validation(format!(
                "specification '{}' has invalid selection bounds {min}..={max} for {} options",
                self.id(),
                options.len()
            )));
        }

        Ok(())
    }
}

/// Validate a menu item's specification list as a whole.
pub fn validate_specifications(specifications: &[Specification]) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for spec in specifications {
        spec.validate()?;
        if !seen.insert(spec.id()) {
            return Err(DomainError::validation(format!(
                "duplicate specification '{}'",
                spec.id()
            )));
        }
    }
    Ok(())
}

/// Options a customer picked for one specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub specification_id: SpecificationId,
    pub option_ids: Vec<OptionId>,
}

impl Selection {
    pub fn new(specification_id: impl Into<SpecificationId>, option_ids: Vec<OptionId>) -> Self {
        Self {
            specification_id: specification_id.into(),
            option_ids,
        }
    }

    pub fn single(specification_id: impl Into<SpecificationId>, option_id: impl Into<OptionId>) -> Self {
        Self::new(specification_id, vec![option_id.into()])
    }
}

/// Check an order line's selections against the item's specifications.
///
/// A specification without a selection counts as zero options chosen.
pub fn validate_selections(
    specifications: &[Specification],
    selections: &[Selection],
) -> DomainResult<()> {
    let mut selected = HashSet::new();
    for selection in selections {
        let spec = specifications
            .iter()
            .find(|s| s.id() == &selection.specification_id)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown specification '{}'",
                    selection.specification_id
                ))
            })?;

        if !selected.insert(&selection.specification_id) {
            return Err(DomainError::validation(format!(
                "specification '{}' selected twice",
                selection.specification_id
            )));
        }

        let mut options = HashSet::new();
        for option_id in &selection.option_ids {
            if spec.option(option_id).is_none() {
                return Err(DomainError::validation(format!(
                    "unknown option '{option_id}' for specification '{}'",
                    spec.id()
                )));
            }
            if !options.insert(option_id) {
                return Err(DomainError::validation(format!(
                    "option '{option_id}' chosen twice"
                )));
            }
        }
    }

    for spec in specifications {
        let chosen = selections
            .iter()
            .find(|s| &s.specification_id == spec.id())
            .map_or(0, |s| s.option_ids.len());
        let (min, max) = (spec.min_selections() as usize, spec.max_selections() as usize);
        if chosen < min || chosen > max {
            return Err(DomainError::validation(format!(
                "specification '{}' needs between {min} and {max} options, got {chosen}",
                spec.id()
            )));
        }
    }

    Ok(())
}

/// Selling price of an item once the chosen options' modifiers are added.
pub fn price_with_selections(
    price: Decimal,
    specifications: &[Specification],
    selections: &[Selection],
) -> DomainResult<Decimal> {
    validate_selections(specifications, selections)?;

    let overflow = || DomainError::validation("price with options is out of range");
    let mut total = price;
    for sel in selections {
        let Some(spec) = specifications.iter().find(|s| s.id() == &sel.specification_id) else {
            continue;
        };
        for option in sel.option_ids.iter().filter_map(|id| spec.option(id)) {
            total = total.checked_add(option.price_modifier).ok_or_else(overflow)?;
        }
    }

    Ok(total)
}
