use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use bistro_core::{DomainResult, TenantId};
use bistro_menu::MenuTheme;

/// Per-tenant display theme, swapped whole on every change.
///
/// Readers get an `Arc` snapshot; an update never mutates a theme someone may
/// still be rendering with.
#[derive(Debug, Default)]
pub struct ThemeStore {
    themes: RwLock<HashMap<TenantId, Arc<MenuTheme>>>,
}

impl ThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current theme, or the default one if the tenant never set any.
    pub fn get(&self, tenant_id: TenantId) -> Arc<MenuTheme> {
        let themes = self.themes.read().unwrap_or_else(PoisonError::into_inner);
        themes
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(MenuTheme::default()))
    }

    pub fn set(&self, tenant_id: TenantId, theme: MenuTheme) -> Arc<MenuTheme> {
        let theme = Arc::new(theme);
        let mut themes = self.themes.write().unwrap_or_else(PoisonError::into_inner);
        themes.insert(tenant_id, theme.clone());
        debug!(tenant_id = %tenant_id, "menu theme replaced");
        theme
    }

    /// Derive a new theme from the current one and swap it in.
    ///
    /// Runs under the write lock, so concurrent updates compose instead of
    /// overwriting each other. On error the stored theme is left as it was.
    pub fn update(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&MenuTheme) -> DomainResult<MenuTheme>,
    ) -> DomainResult<Arc<MenuTheme>> {
        let mut themes = self.themes.write().unwrap_or_else(PoisonError::into_inner);
        let next = match themes.get(&tenant_id) {
            Some(current) => f(current)?,
            None => f(&MenuTheme::default())?,
        };
        let next = Arc::new(next);
        themes.insert(tenant_id, next.clone());
        debug!(tenant_id = %tenant_id, "menu theme updated");
        Ok(next)
    }

    pub fn reset(&self, tenant_id: TenantId) {
        let mut themes = self.themes.write().unwrap_or_else(PoisonError::into_inner);
        themes.remove(&tenant_id);
    }
}
