//! Schema URN grammar (spec §6, bit-exact):
//!
//! `urn:schema:jade:(command|event):{aggregate}:{action}:{version}`
//!
//! where `{aggregate}` and `{action}` match `[a-z][a-z0-9-]*` and
//! `{version}` matches `[1-9][0-9]*`.

use crate::errors::CqrsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Command,
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSchema {
    pub kind: SchemaKind,
    pub aggregate: String,
    pub action: String,
    pub version: String,
}

fn is_token(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_version(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() && c != '0' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_digit())
}

/// Parses a schema URN, enforcing the exact 7-segment grammar.
pub fn parse(urn: &str) -> Result<ParsedSchema, CqrsError> {
    let segments: Vec<&str> = urn.split(':').collect();
    if segments.len() != 7 {
        return Err(CqrsError::UnknownSchema(urn.to_string()));
    }
    let [urn_tag, schema_tag, jade_tag, kind_tag, aggregate, action, version] = segments[..7]
        .try_into()
        .map_err(|_| CqrsError::UnknownSchema(urn.to_string()))?;
    if urn_tag != "urn" || schema_tag != "schema" || jade_tag != "jade" {
        return Err(CqrsError::UnknownSchema(urn.to_string()));
    }
    let kind = match kind_tag {
        "command" => SchemaKind::Command,
        "event" => SchemaKind::Event,
        _ => return Err(CqrsError::UnknownSchema(urn.to_string())),
    };
    if !is_token(aggregate) || !is_token(action) || !is_version(version) {
        return Err(CqrsError::UnknownSchema(urn.to_string()));
    }
    Ok(ParsedSchema {
        kind,
        aggregate: aggregate.to_string(),
        action: action.to_string(),
        version: version.to_string(),
    })
}

/// Extracts the `{aggregate}` segment of a command schema URN (spec §4.G
/// step 2 / §4.H step 1). Used both by CloudEvents ingress and the queue
/// publisher, which names queues after it.
pub fn command_aggregate(urn: &str) -> Result<String, CqrsError> {
    let parsed = parse(urn)?;
    if parsed.kind != SchemaKind::Command {
        return Err(CqrsError::UnknownSchema(urn.to_string()));
    }
    Ok(parsed.aggregate)
}

/// Validates a stream-prefix token (`[a-z][a-z0-9-]*`, spec §6).
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.len() <= 32 && is_token(prefix)
}

/// Builds the stream id for an aggregate instance: `{prefix}-{aggregateId}`.
pub fn stream_id(prefix: &str, aggregate_id: &str) -> String {
    format!("{prefix}-{aggregate_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_command_urn() {
        let parsed = parse("urn:schema:jade:command:customer:create:1").unwrap();
        assert_eq!(parsed.kind, SchemaKind::Command);
        assert_eq!(parsed.aggregate, "customer");
        assert_eq!(parsed.action, "create");
        assert_eq!(parsed.version, "1");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(parse("urn:schema:jade:command:customer:create").is_err());
        assert!(parse("urn:schema:jade:command:customer:create:1:extra").is_err());
    }

    #[test]
    fn rejects_leading_zero_version() {
        assert!(parse("urn:schema:jade:command:customer:create:01").is_err());
    }

    #[test]
    fn rejects_uppercase_segments() {
        assert!(parse("urn:schema:jade:command:Customer:create:1").is_err());
    }

    #[test]
    fn command_aggregate_extracts_segment() {
        assert_eq!(
            command_aggregate("urn:schema:jade:command:order:cancel:2").unwrap(),
            "order"
        );
    }

    #[test]
    fn command_aggregate_rejects_event_schema() {
        assert!(command_aggregate("urn:schema:jade:event:order:cancelled:2").is_err());
    }

    #[test]
    fn stream_id_joins_prefix_and_id() {
        assert_eq!(stream_id("customer", "c1"), "customer-c1");
    }

    #[test]
    fn prefix_validation() {
        assert!(is_valid_prefix("customer"));
        assert!(is_valid_prefix("line-item"));
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("Customer"));
        assert!(!is_valid_prefix(&"a".repeat(33)));
    }
}
