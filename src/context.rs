use crate::metadata::Metadata;
use chrono::{DateTime, Utc};

/// Ambient, per-request context threaded through the pipeline: who is
/// calling, what request this is, and the clock/randomness sources the
/// pipeline should use instead of calling `Utc::now()` or `rand` directly.
#[derive(Debug, Clone)]
pub struct CqrsContext {
    current_user: Option<String>,
    request_id: String,
    now: DateTime<Utc>,
    rand_bytes: Option<[u8; 16]>,
    command_metadata: Option<Metadata>,
}

impl CqrsContext {
    pub fn new(current_user: Option<String>) -> Self {
        Self {
            current_user,
            request_id: String::new(),
            now: Utc::now(),
            rand_bytes: None,
            command_metadata: None,
        }
    }

    /// Attaches the metadata of the command being processed, so events
    /// produced in this context derive their correlation/causation from it
    /// (spec §3).
    pub fn with_command_metadata(mut self, metadata: Metadata) -> Self {
        self.command_metadata = Some(metadata);
        self
    }

    /// Builds the metadata for the next event persisted in this context:
    /// derived from the command's metadata if one was attached, otherwise a
    /// fresh root metadata entry.
    pub fn event_metadata(&self) -> Metadata {
        let id = self.next_uuid();
        match &self.command_metadata {
            Some(command_metadata) => command_metadata.derive(id).stamp_if_absent(self.now),
            None => Metadata::new(id.clone(), id).stamp_if_absent(self.now),
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn with_current_user(mut self, current_user: Option<String>) -> Self {
        self.current_user = current_user;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn with_next_request_id(self) -> Self {
        let request_id = self.next_uuid();
        Self { request_id, ..self }
    }

    pub fn with_request_id(self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..self
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Overrides the random bytes backing `next_uuid`. Test-only: it
    /// breaks the uniqueness guarantee of UUID generation, so deterministic
    /// ids can be asserted against in tests.
    pub fn with_rand_bytes(mut self, bytes: [u8; 16]) -> Self {
        self.rand_bytes = Some(bytes);
        self
    }

    pub fn next_uuid(&self) -> String {
        let bytes = self.rand_bytes.unwrap_or_else(rand::random);
        uuid::Builder::from_random_bytes(bytes).as_uuid().to_string()
    }
}

impl Default for CqrsContext {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_uuid_has_uuid_shape() {
        let context = CqrsContext::default();
        assert_eq!(context.next_uuid().len(), 36);
    }

    #[test]
    fn next_uuid_with_rand_bytes_is_deterministic() {
        let context = CqrsContext::default().with_rand_bytes([0; 16]);
        assert_eq!(
            context.next_uuid(),
            "00000000-0000-4000-8000-000000000000"
        );
    }
}
