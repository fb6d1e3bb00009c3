/// Execute an aggregate command in place (no IO, no persistence).
///
/// Decides events with `handle`, then folds each one back with `apply`. Used by
/// domain tests and by code that needs the decision without a store; anything
/// that must survive a restart goes through the infra `CommandDispatcher`.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: bistro_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
