use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use bistro_core::{AggregateId, TenantId};
use bistro_menu::{
    AGGREGATE_TYPE, CreateMenuItem, MenuCommand, MenuItem, MenuItemDetails, MenuItemId, MenuTheme,
    UpdateMenuItem,
};

use crate::projections::MenuItemView;
use crate::theme_store::ThemeStore;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

fn make_menu_item(_: TenantId, id: AggregateId) -> MenuItem {
    MenuItem::empty(MenuItemId::new(id))
}

/// Menu items with their options, plus the tenant's display theme.
#[derive(Debug, Clone)]
pub struct MenuService {
    ctx: Arc<ServiceContext>,
    themes: Arc<ThemeStore>,
}

impl MenuService {
    pub fn new(ctx: Arc<ServiceContext>, themes: Arc<ThemeStore>) -> Self {
        Self { ctx, themes }
    }

    pub fn create_menu_item(&self, tenant_id: TenantId, details: MenuItemDetails) -> ServiceResult<MenuItemView> {
        let menu_item_id = MenuItemId::new(AggregateId::new());
        let command = MenuCommand::CreateMenuItem(CreateMenuItem {
            tenant_id,
            menu_item_id,
            details,
            occurred_at: Utc::now(),
        });
        let committed =
            self.ctx
                .dispatcher
                .dispatch(tenant_id, menu_item_id.0, AGGREGATE_TYPE, &command, make_menu_item)?;
        self.ctx.project(&committed)?;

        info!(tenant_id = %tenant_id, menu_item_id = %menu_item_id, "menu item created");
        self.require(tenant_id, &menu_item_id)
    }

    pub fn update_menu_item(
        &self,
        tenant_id: TenantId,
        menu_item_id: MenuItemId,
        details: MenuItemDetails,
    ) -> ServiceResult<MenuItemView> {
        let command = MenuCommand::UpdateMenuItem(UpdateMenuItem {
            tenant_id,
            menu_item_id,
            details,
            occurred_at: Utc::now(),
        });
        let committed = self.ctx.dispatcher.dispatch_with_retry(
            tenant_id,
            menu_item_id.0,
            AGGREGATE_TYPE,
            &command,
            make_menu_item,
        )?;
        self.ctx.project(&committed)?;
        self.require(tenant_id, &menu_item_id)
    }

    pub fn get_menu_item(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> Option<MenuItemView> {
        self.ctx.read_models.menu.get(tenant_id, menu_item_id)
    }

    pub fn list_menu_items(&self, tenant_id: TenantId) -> Vec<MenuItemView> {
        self.ctx.read_models.menu.list(tenant_id)
    }

    pub fn theme(&self, tenant_id: TenantId) -> Arc<MenuTheme> {
        self.themes.get(tenant_id)
    }

    /// Derive a new theme from the current one, e.g. `|t| Ok(t.with_layout(MenuLayout::List))`.
    pub fn update_theme(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&MenuTheme) -> bistro_core::DomainResult<MenuTheme>,
    ) -> ServiceResult<Arc<MenuTheme>> {
        Ok(self.themes.update(tenant_id, f)?)
    }

    pub(crate) fn require(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> ServiceResult<MenuItemView> {
        self.get_menu_item(tenant_id, menu_item_id)
            .ok_or_else(|| ServiceError::not_found(format!("menu item {menu_item_id}")))
    }
}
