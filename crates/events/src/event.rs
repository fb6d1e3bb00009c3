use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are facts: never edited, never deleted. The movement ledger depends on
/// this directly, since a stock balance is only ever the fold of its events.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.item.movement_recorded").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
