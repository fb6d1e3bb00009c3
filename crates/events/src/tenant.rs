use bistro_core::TenantId;

use crate::EventEnvelope;

/// Messages that belong to exactly one tenant.
///
/// Background workers use this to drop messages for venues they were not
/// started for.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}
