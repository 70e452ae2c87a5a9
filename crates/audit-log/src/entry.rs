use serde::{Deserialize, Serialize};

/// A single audit record describing something the gateway did at its edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// Create a new entry stamped with a fresh UUID v4 and the current UTC
    /// time.
    pub fn new(
        event_type: AuditEventType,
        source: AuditSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            source,
            details,
        }
    }
}

/// The category of audit event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ProcessStarted,
    ProcessStopped,
    OriginRejected,
    RpcForwarded,
    RpcFailed,
    BridgeOpened,
    BridgeClosed,
    BridgeFailed,
}

/// Identifies the component that emitted the event plus whatever request
/// metadata was known at the time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSource {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AuditSource {
    /// Source carrying only the component name.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            origin: None,
            remote_addr: None,
            session_id: None,
        }
    }

    pub fn with_origin(mut self, origin: Option<&str>) -> Self {
        self.origin = origin.map(str::to_string);
        self
    }

    pub fn with_remote_addr(mut self, remote_addr: impl ToString) -> Self {
        self.remote_addr = Some(remote_addr.to_string());
        self
    }

    pub fn with_session_id(mut self, session_id: impl ToString) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_string(&AuditEventType::OriginRejected).unwrap();
        assert_eq!(json, "\"origin_rejected\"");
        let json = serde_json::to_string(&AuditEventType::BridgeClosed).unwrap();
        assert_eq!(json, "\"bridge_closed\"");
    }

    #[test]
    fn empty_source_fields_are_omitted() {
        let entry = AuditEntry::new(
            AuditEventType::RpcForwarded,
            AuditSource::new("rpc"),
            serde_json::json!({ "status": 200 }),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["source"]["component"], "rpc");
        assert!(value["source"].get("origin").is_none());
        assert!(value["source"].get("session_id").is_none());
        assert_eq!(value["details"]["status"], 200);
    }

    #[test]
    fn builder_fills_optional_fields() {
        let source = AuditSource::new("bridge")
            .with_origin(Some("https://app.example"))
            .with_remote_addr("10.0.0.1:4000")
            .with_session_id("abc");
        assert_eq!(source.origin.as_deref(), Some("https://app.example"));
        assert_eq!(source.remote_addr.as_deref(), Some("10.0.0.1:4000"));
        assert_eq!(source.session_id.as_deref(), Some("abc"));
    }
}
