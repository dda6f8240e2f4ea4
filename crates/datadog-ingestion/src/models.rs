// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use uuid::Uuid;

/// Identifies where a batch of logs is delivered. Passed through to the
/// transport untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Application secret, sent as the `App-Secret` header.
    pub app_secret: String,
    /// Installation identifier, sent as the `Install-ID` header.
    pub install_id: Uuid,
}

impl Destination {
    pub fn new(app_secret: impl Into<String>, install_id: Uuid) -> Self {
        Self {
            app_secret: app_secret.into(),
            install_id,
        }
    }
}

/// A batch of already-built log events, serialized as `{"logs": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogContainer {
    pub logs: Vec<serde_json::Value>,
}

impl LogContainer {
    pub fn new(logs: Vec<serde_json::Value>) -> Self {
        Self { logs }
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Successful answer from the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionResponse {
    /// HTTP status code, always 2xx.
    pub status: u16,
    /// Response body; empty when it could not be read.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_container_serialization() {
        let container = LogContainer::new(vec![json!({"type": "event", "name": "click"})]);
        let serialized = serde_json::to_string(&container).expect("serialization failed");
        assert_eq!(serialized, r#"{"logs":[{"name":"click","type":"event"}]}"#);
    }

    #[test]
    fn test_empty_container() {
        let container = LogContainer::default();
        assert!(container.is_empty());
        assert_eq!(container.len(), 0);
        assert_eq!(
            serde_json::to_string(&container).expect("serialization failed"),
            r#"{"logs":[]}"#
        );
    }
}
