use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use bistro_events::Event;

use crate::specification::{Specification, validate_specifications};

pub const AGGREGATE_TYPE: &str = "menu.item";

/// Menu item identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub AggregateId);

impl MenuItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemDetails {
    pub name: String,
    pub category: String,
    /// Selling price before option modifiers.
    pub price: Decimal,
    pub specifications: Vec<Specification>,
    pub is_available: bool,
}

impl MenuItemDetails {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price,
            specifications: Vec::new(),
            is_available: true,
        }
    }

    pub fn with_specification(mut self, specification: Specification) -> Self {
        self.specifications.push(specification);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    pub fn specification(&self, id: &crate::SpecificationId) -> Option<&Specification> {
        self.specifications.iter().find(|s| s.id() == id)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("menu item name cannot be empty"));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        validate_specifications(&self.specifications)
    }
}

/// Aggregate root: MenuItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    id: MenuItemId,
    tenant_id: Option<TenantId>,
    details: Option<MenuItemDetails>,
    version: u64,
}

impl MenuItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: MenuItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            details: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> MenuItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn details(&self) -> Option<&MenuItemDetails> {
        self.details.as_ref()
    }
}

impl AggregateRoot for MenuItem {
    type Id = MenuItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateMenuItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMenuItem {
    pub tenant_id: TenantId,
    pub menu_item_id: MenuItemId,
    pub details: MenuItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateMenuItem (full replacement of the editable fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMenuItem {
    pub tenant_id: TenantId,
    pub menu_item_id: MenuItemId,
    pub details: MenuItemDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuCommand {
    CreateMenuItem(CreateMenuItem),
    UpdateMenuItem(UpdateMenuItem),
}

/// Event: MenuItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemCreated {
    pub tenant_id: TenantId,
    pub menu_item_id: MenuItemId,
    pub details: MenuItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MenuItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemUpdated {
    pub tenant_id: TenantId,
    pub menu_item_id: MenuItemId,
    pub details: MenuItemDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuEvent {
    MenuItemCreated(MenuItemCreated),
    MenuItemUpdated(MenuItemUpdated),
}

impl MenuEvent {
    pub fn menu_item_id(&self) -> MenuItemId {
        match self {
            MenuEvent::MenuItemCreated(e) => e.menu_item_id,
            MenuEvent::MenuItemUpdated(e) => e.menu_item_id,
        }
    }

    pub fn details(&self) -> &MenuItemDetails {
        match self {
            MenuEvent::MenuItemCreated(e) => &e.details,
            MenuEvent::MenuItemUpdated(e) => &e.details,
        }
    }
}

impl Event for MenuEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MenuEvent::MenuItemCreated(_) => "menu.item.created",
            MenuEvent::MenuItemUpdated(_) => "menu.item.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MenuEvent::MenuItemCreated(e) => e.occurred_at,
            MenuEvent::MenuItemUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MenuItem {
    type Command = MenuCommand;
    type Event = MenuEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MenuEvent::MenuItemCreated(e) => {
                self.id = e.menu_item_id;
                self.tenant_id = Some(e.tenant_id);
                self.details = Some(e.details.clone());
            }
            MenuEvent::MenuItemUpdated(e) => {
                self.details = Some(e.details.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MenuCommand::CreateMenuItem(cmd) => {
                if self.details.is_some() {
                    return Err(DomainError::conflict("menu item already exists"));
                }
                cmd.details.validate()?;

                Ok(vec![MenuEvent::MenuItemCreated(MenuItemCreated {
                    tenant_id: cmd.tenant_id,
                    menu_item_id: cmd.menu_item_id,
                    details: cmd.details.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            MenuCommand::UpdateMenuItem(cmd) => {
                let Some(current) = &self.details else {
                    return Err(DomainError::not_found());
                };
                if self.tenant_id != Some(cmd.tenant_id) {
                    return Err(DomainError::invariant("tenant mismatch"));
                }
                if self.id != cmd.menu_item_id {
                    return Err(DomainError::invariant("menu_item_id mismatch"));
                }
                cmd.details.validate()?;

                if *current == cmd.details {
                    return Ok(vec![]);
                }

                Ok(vec![MenuEvent::MenuItemUpdated(MenuItemUpdated {
                    tenant_id: cmd.tenant_id,
                    menu_item_id: cmd.menu_item_id,
                    details: cmd.details.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
