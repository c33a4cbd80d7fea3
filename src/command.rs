use crate::metadata::{AggregateId, Metadata};
use crate::Aggregate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A single command variant. Each concrete command type is associated with
/// a schema URN of the form `urn:schema:jade:command:{aggregate}:{action}:{version}`
/// (spec §3). The URN is discoverable from the type alone (`Command::SCHEMA`),
/// not from an instance — the registry uses this to register a command's
/// wire contract before any request carrying it arrives (spec §4.E).
pub trait Command: Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const SCHEMA: &'static str;

    fn metadata(&self) -> &Metadata;
}

/// Maps one concrete command type onto the unified command enum of the
/// aggregate it targets, and exposes the id used for rehydration (spec
/// §4.C step 1). `None` means "no id yet" — legal only for commands that
/// can only ever hit the create path (the engine still validates non-empty
/// ids once an id is returned).
pub trait IntoAggregateCommand<A: Aggregate>: Command {
    fn aggregate_id(&self) -> Option<AggregateId>;
    fn into_aggregate_command(self) -> A::Command;
}
