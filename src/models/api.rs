use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resource as seen by clients. Every URI is client-facing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// URI of the resource
    pub id: String,
    /// URI of the parent container (absent for the root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// URIs of the direct children
    pub children: Vec<String>,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}

/// Registered namespace prefixes.
#[derive(Debug, Serialize, Deserialize)]
pub struct NamespacesResponse {
    /// Prefix to namespace URI
    pub namespaces: BTreeMap<String, String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_root_resource_omits_parent() {
        let response = ResourceResponse {
            id: "https://example.org/rest".to_string(),
            parent: None,
            children: vec!["https://example.org/rest/a".to_string()],
            created: Utc::now(),
        };

        let json = serde_json::to_string(&response).expect("Serialization should succeed");
        assert!(!json.contains("parent"));
        assert!(json.contains("\"id\":\"https://example.org/rest\""));
    }

    #[test]
    fn test_resource_response_deserialization() {
        let json = r#"{
            "id": "http://h/rest/a",
            "parent": "http://h/rest",
            "children": [],
            "created": "2024-01-15T10:30:00Z"
        }"#;
        let response: ResourceResponse =
            serde_json::from_str(json).expect("Deserialization should succeed");

        assert_eq!(response.parent.as_deref(), Some("http://h/rest"));
        assert!(response.children.is_empty());
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 5,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&response).expect("Serialization should succeed");
        assert!(json.contains("\"status\":\"healthy\""));
    }
}
