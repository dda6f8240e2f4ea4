// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced by ingestion clients, either through a call's completion
/// callback or from configuration and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// Non-2xx answer from the endpoint.
    #[error("Ingestion endpoint returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or timeout failure before an answer was received.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to serialize logs: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to compress payload: {0}")]
    Compression(String),

    /// The client was closed before the send.
    #[error("Ingestion client is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl IngestionError {
    /// Whether sending the same payload again could succeed.
    ///
    /// 4xx answers, malformed payloads and a closed client are permanent; server
    /// errors and transport failures are not. The retry queue never acts on this
    /// itself, it is exposed for policies layered on top.
    pub fn is_recoverable(&self) -> bool {
        match self {
            IngestionError::Http { status, .. } => !(400..500).contains(status),
            IngestionError::Transport(_) => true,
            IngestionError::Serialization(_)
            | IngestionError::Compression(_)
            | IngestionError::Closed
            | IngestionError::InvalidConfig(_)
            | IngestionError::Runtime(_) => false,
        }
    }
}

impl From<reqwest::Error> for IngestionError {
    fn from(err: reqwest::Error) -> Self {
        IngestionError::Transport(err.to_string())
    }
}
