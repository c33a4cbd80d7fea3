//! CloudEvents command ingress (spec §4.G): validates a v1.0 CloudEvents
//! envelope, extracts the target aggregate from its `dataschema`, and
//! either dispatches the command directly or hands it to the queue
//! publisher.

#[cfg(feature = "http")]
pub mod http;

use crate::bus::CommandBus;
use crate::errors::CqrsError;
use crate::schema;
use crate::CqrsContext;
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// CloudEvents v1.0 subset this crate consumes (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jade: Option<JadeExtension>,
}

/// The `jade` CloudEvents extension: correlation/causation/user/tenant,
/// threaded into the command's `Metadata` when dispatching directly.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JadeExtension {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudEventStatus {
    Accepted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloudEventResponse {
    pub id: String,
    pub status: CloudEventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CloudEventResponse {
    fn accepted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CloudEventStatus::Accepted,
            message: None,
        }
    }

    fn rejected(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CloudEventStatus::Rejected,
            message: Some(message.into()),
        }
    }

    fn failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CloudEventStatus::Failed,
            message: Some(message.into()),
        }
    }

    /// Classifies a dispatch-time `CqrsError` as `rejected` (bad schema/
    /// payload/no handler, the caller's fault) or `failed` (everything
    /// else — a handler or store error), per spec §4.G step 4's "any
    /// handler error → 500 failed".
    fn rejected_or_failed(id: impl Into<String>, e: &CqrsError) -> Self {
        match e {
            CqrsError::UnknownSchema(_) | CqrsError::NoHandler(_) | CqrsError::MalformedPayload(_) => {
                Self::rejected(id, e.to_string())
            }
            _ => Self::failed(id, e.to_string()),
        }
    }
}

/// Validates envelope fields per spec §4.G step 1 (non-empty `id`/`source`/
/// `type`, `specversion == "1.0"`).
pub fn validate_envelope(ce: &CloudEvent) -> Result<(), CqrsError> {
    if ce.id.is_empty() {
        return Err(CqrsError::EnvelopeInvalid("id must not be empty".to_string()));
    }
    if ce.source.is_empty() {
        return Err(CqrsError::EnvelopeInvalid("source must not be empty".to_string()));
    }
    if ce.event_type.is_empty() {
        return Err(CqrsError::EnvelopeInvalid("type must not be empty".to_string()));
    }
    if ce.specversion != "1.0" {
        return Err(CqrsError::EnvelopeInvalid(format!(
            "unsupported specversion: {}",
            ce.specversion
        )));
    }
    Ok(())
}

/// Extracts and validates the command schema from `dataschema` (spec §4.G
/// step 2): must be present and parse as a command schema URN. Grouped with
/// `UnknownSchema`, not `EnvelopeInvalid` — a missing or unrecognized
/// schema is a `422`, not the `400` reserved for envelope shape (spec §6).
pub fn command_schema(ce: &CloudEvent) -> Result<&str, CqrsError> {
    let dataschema = ce
        .dataschema
        .as_deref()
        .ok_or_else(|| CqrsError::UnknownSchema("dataschema is required".to_string()))?;
    schema::command_aggregate(dataschema)?;
    Ok(dataschema)
}

fn context_from_jade(jade: Option<&JadeExtension>) -> CqrsContext {
    let context = CqrsContext::default();
    match jade {
        Some(jade) => context.with_current_user(jade.user_id.clone()),
        None => context,
    }
}

/// Durable enqueue side of the queued path (spec §4.H). Kept independent of
/// any particular queue engine so the `http`-only build doesn't have to
/// pull in a backend; `queue::storage::PostgresQueue` is the shipped
/// implementation (feature `postgres`).
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, cloud_event: &CloudEvent) -> Result<(), CqrsError>;
}

/// Which half of §4.G this ingress instance runs. A deployment picks one
/// per aggregate family at wiring time; the HTTP surface is the same.
pub enum IngressMode {
    Direct(CommandBus),
    Queued(std::sync::Arc<dyn Publisher>),
}

/// Validates the envelope and schema, then either dispatches directly or
/// publishes for later delivery, translating the outcome into the
/// CloudEvents response body and its HTTP status (spec §4.G step 4, §6).
/// The status is always derived from the originating `CqrsError`'s own
/// `status()` mapping, never from the response's human-readable message —
/// a future wording change to a message must not silently flip the code.
pub async fn process(ce: &CloudEvent, mode: &IngressMode) -> (CloudEventResponse, StatusCode) {
    if let Err(e) = validate_envelope(ce) {
        warn!(id = %ce.id, error = %e, "rejected cloud event: invalid envelope");
        return (CloudEventResponse::rejected(&ce.id, e.to_string()), e.status());
    }
    let schema = match command_schema(ce) {
        Ok(schema) => schema,
        Err(e) => {
            warn!(id = %ce.id, error = %e, "rejected cloud event: bad schema");
            return (CloudEventResponse::rejected(&ce.id, e.to_string()), e.status());
        }
    };

    match mode {
        IngressMode::Direct(bus) => process_direct(ce, schema, bus).await,
        IngressMode::Queued(publisher) => process_queued(ce, publisher.as_ref()).await,
    }
}

async fn process_direct(ce: &CloudEvent, schema: &str, bus: &CommandBus) -> (CloudEventResponse, StatusCode) {
    let Some(data) = ce.data.clone() else {
        let e = CqrsError::MalformedPayload("data is required".to_string());
        return (CloudEventResponse::rejected(&ce.id, e.to_string()), e.status());
    };

    let context = context_from_jade(ce.jade.as_ref());
    debug!(id = %ce.id, schema, "dispatching cloud event directly");
    match bus.dispatch_payload(schema, data, context).await {
        Ok(()) => (CloudEventResponse::accepted(&ce.id), StatusCode::ACCEPTED),
        Err(e) => (CloudEventResponse::rejected_or_failed(&ce.id, &e), e.status()),
    }
}

async fn process_queued(ce: &CloudEvent, publisher: &dyn Publisher) -> (CloudEventResponse, StatusCode) {
    debug!(id = %ce.id, "publishing cloud event for queued delivery");
    match publisher.publish(ce).await {
        Ok(()) => (CloudEventResponse::accepted(&ce.id), StatusCode::ACCEPTED),
        Err(e) => {
            let response = CloudEventResponse::failed(&ce.id, e.to_string());
            (response, e.status())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dataschema: Option<&str>, data: Option<Value>) -> CloudEvent {
        CloudEvent {
            id: "ce-1".to_string(),
            source: "test".to_string(),
            specversion: "1.0".to_string(),
            event_type: "urn:schema:jade:command:customer:create:1".to_string(),
            datacontenttype: Some("application/json".to_string()),
            dataschema: dataschema.map(str::to_string),
            subject: None,
            time: None,
            data,
            jade: None,
        }
    }

    #[test]
    fn validate_envelope_rejects_wrong_specversion() {
        let mut ce = sample(Some("urn:schema:jade:command:customer:create:1"), None);
        ce.specversion = "0.3".to_string();
        assert!(matches!(validate_envelope(&ce), Err(CqrsError::EnvelopeInvalid(_))));
    }

    #[test]
    fn validate_envelope_accepts_well_formed() {
        let ce = sample(Some("urn:schema:jade:command:customer:create:1"), None);
        assert!(validate_envelope(&ce).is_ok());
    }

    #[test]
    fn command_schema_requires_command_urn() {
        let ce = sample(Some("urn:schema:jade:event:customer:created:1"), None);
        assert!(command_schema(&ce).is_err());
    }

    #[test]
    fn command_schema_missing_is_rejected() {
        let ce = sample(None, None);
        assert!(command_schema(&ce).is_err());
    }
}
