/// Audit Trail Recording
///
/// Structured records for security-relevant account events: signups, failed
/// logins, token consumption, password changes, forced session teardowns.
/// Records are emitted as structured tracing events so the log pipeline can
/// index them by action and outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One audited account event
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub audit_id: String,
    /// Action performed (e.g. CREATE_USER, LOGIN, CONSUME_TOKEN)
    pub action: String,
    /// Resource category the action touched (user, token, session, business)
    pub resource_type: String,
    /// Resource identifier, when one exists
    pub resource_id: Option<String>,
    /// SUCCESS or FAILURE
    pub outcome: String,
    pub detail: String,
    pub timestamp: String,
}

impl AuditLog {
    pub fn new(
        action: impl Into<String>,
        resource_type: impl Into<String>,
        outcome: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            outcome: outcome.into(),
            detail: detail.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_resource_id(mut self, resource_id: String) -> Self {
        self.resource_id = Some(resource_id);
        self
    }
}

/// Metadata identifying the request a failure belongs to
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: String,
    pub http_method: String,
    pub request_path: String,
    pub client_ip: Option<String>,
    pub request_timestamp: DateTime<Utc>,
}

impl RequestMetadata {
    pub fn new(request_id: String, http_method: String, request_path: String) -> Self {
        Self {
            request_id,
            http_method,
            request_path,
            client_ip: None,
            request_timestamp: Utc::now(),
        }
    }

    pub fn with_client_ip(mut self, client_ip: String) -> Self {
        self.client_ip = Some(client_ip);
        self
    }
}

/// Emits audit records into the structured log stream
pub struct RequestFailureLogger;

impl RequestFailureLogger {
    pub fn log_audit(audit: &AuditLog) {
        match audit.outcome.as_str() {
            "SUCCESS" => {
                tracing::info!(
                    audit_id = %audit.audit_id,
                    action = %audit.action,
                    resource_type = %audit.resource_type,
                    resource_id = ?audit.resource_id,
                    detail = %audit.detail,
                    "Audit event"
                );
            }
            _ => {
                tracing::warn!(
                    audit_id = %audit.audit_id,
                    action = %audit.action,
                    resource_type = %audit.resource_type,
                    resource_id = ?audit.resource_id,
                    detail = %audit.detail,
                    "Audit event (failure)"
                );
            }
        }
    }

    pub fn log_failed_request(metadata: &RequestMetadata, error_type: &str, message: &str) {
        tracing::warn!(
            request_id = %metadata.request_id,
            http_method = %metadata.http_method,
            request_path = %metadata.request_path,
            client_ip = ?metadata.client_ip,
            error_type = error_type,
            message = message,
            "Request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log_creation() {
        let audit = AuditLog::new("LOGIN", "session", "FAILURE", "wrong password")
            .with_resource_id("user-1".to_string());

        assert_eq!(audit.action, "LOGIN");
        assert_eq!(audit.outcome, "FAILURE");
        assert_eq!(audit.resource_id, Some("user-1".to_string()));
        assert!(chrono::DateTime::parse_from_rfc3339(&audit.timestamp).is_ok());
    }

    #[test]
    fn test_request_metadata_client_ip() {
        let metadata = RequestMetadata::new(
            "req-1".to_string(),
            "POST".to_string(),
            "/auth/login".to_string(),
        )
        .with_client_ip("127.0.0.1".to_string());

        assert_eq!(metadata.client_ip, Some("127.0.0.1".to_string()));
    }
}
