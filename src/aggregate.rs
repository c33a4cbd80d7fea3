use crate::event::Event;
use std::fmt::Debug;

/// The five-part contract every domain aggregate implements (spec §4.B).
///
/// `create` and `decide` are pure and free of I/O — all side effects (store
/// calls, external services) live in the pipeline and in custom handlers,
/// never inside the aggregate itself.
pub trait Aggregate: Debug + Clone + Send + Sync + Sized + 'static {
    /// Non-empty stream-prefix token (letters/digits/`-`, <= 32 chars).
    const PREFIX: &'static str;

    /// The unified command enum for this aggregate. One Rust type per
    /// action is registered against the bus/registry and converts into this
    /// enum via `IntoAggregateCommand`; `create`/`decide` match on it.
    type Command: Debug + Clone + Send + Sync;

    type Event: Event;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Used when no stream exists yet for the command's target id. Must not
    /// require state. An empty result is rejected by the pipeline as
    /// `DomainRejection` (spec §4.C edge policy) — `create` must produce at
    /// least one event.
    fn create(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Used when a stream already exists. `Ok(vec![])` means "no-op,
    /// idempotent": the pipeline returns success without appending or
    /// advancing the version.
    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Builds the initial state from the first event of a stream. Must
    /// accept any event that could legally be first.
    fn init(event: Self::Event) -> Self;

    /// Folds one subsequent event into state. Total over all the
    /// aggregate's event variants: an event the aggregate doesn't
    /// recognize must leave state unchanged (forward-compatibility).
    fn evolve(&mut self, event: Self::Event);
}
