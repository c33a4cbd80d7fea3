//! The error taxonomy for the whole pipeline (spec §7).
//!
//! Every component returns `Result<_, CqrsError>` (or a narrower alias).
//! Nothing is thrown across a component boundary; infrastructure errors
//! (serde, tokio-postgres, ...) are caught at the edge and translated into
//! the nearest variant here.

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CqrsError {
    /// Missing or invalid aggregate id, or an unknown command shape.
    #[error("bad command: {0}")]
    BadCommand(String),

    /// The aggregate's `create`/`decide` returned `Err`, or a custom
    /// handler's precondition failed.
    #[error("domain rejection: {0}")]
    DomainRejection(String),

    /// Optimistic append conflict; the caller may retry.
    #[error("optimistic concurrency conflict")]
    Concurrency,

    /// No stream exists for this aggregate id. Internal signal: it only
    /// ever surfaces as part of the create path (spec §4.C/§7), never
    /// returned directly to a caller of the public pipeline API.
    #[error("aggregate not found")]
    NotFound,

    /// Transport/driver error talking to the event store or queue engine.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// The registry has no mapping for this schema URN.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// JSON decode failure for a known schema.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The registry maps the schema to a type but no handler is registered.
    #[error("no handler registered for: {0}")]
    NoHandler(String),

    /// A custom handler's external dependency failed.
    #[error("external dependency failure: {0}")]
    ExternalFailure(String),

    /// CloudEvents envelope validation failed.
    #[error("invalid envelope: {0}")]
    EnvelopeInvalid(String),

    /// The queue engine rejected an enqueue.
    #[error("publish failed: {0}")]
    PublishError(String),

    /// Reserved for a stream whose recorded events no longer fold under the
    /// aggregate's current `init`/`evolve`. `init`/`evolve` are typed as
    /// total pure functions (no `Result`), so nothing in this crate can
    /// construct this variant — a panic there is a programming error, not a
    /// recoverable condition, and is left to unwind rather than papered
    /// over. Kept in the taxonomy for forward-compatibility with backends
    /// that validate stream integrity out-of-band.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
}

impl CqrsError {
    /// HTTP status mapping per spec §7: envelope/decoding/unknown -> 4xx,
    /// handler/store/publish -> 5xx.
    pub fn status(&self) -> StatusCode {
        match self {
            CqrsError::BadCommand(_) => StatusCode::BAD_REQUEST,
            CqrsError::EnvelopeInvalid(_) => StatusCode::BAD_REQUEST,
            CqrsError::UnknownSchema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CqrsError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CqrsError::DomainRejection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CqrsError::Concurrency => StatusCode::CONFLICT,
            CqrsError::NotFound => StatusCode::NOT_FOUND,
            CqrsError::NoHandler(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CqrsError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CqrsError::ExternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CqrsError::PublishError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CqrsError::CorruptStream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may usefully retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CqrsError::Concurrency | CqrsError::StoreFailure(_) | CqrsError::PublishError(_)
        )
    }
}

impl From<serde_json::Error> for CqrsError {
    fn from(e: serde_json::Error) -> Self {
        CqrsError::MalformedPayload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_spec() {
        assert_eq!(CqrsError::Concurrency.status(), StatusCode::CONFLICT);
        assert_eq!(
            CqrsError::UnknownSchema("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CqrsError::StoreFailure("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn retryable_kinds() {
        assert!(CqrsError::Concurrency.is_retryable());
        assert!(!CqrsError::DomainRejection("x".into()).is_retryable());
    }
}
