// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::IngestionError;
use std::env;
use std::time::Duration;

const DEFAULT_INGESTION_URL: &str = "https://http-intake.logs.datadoghq.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the HTTP ingestion transport
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    /// Base URL of the ingestion service
    pub ingestion_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Whether payloads are zstd compressed
    pub use_compression: bool,
    /// zstd compression level (1-21)
    pub compression_level: i32,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            ingestion_url: DEFAULT_INGESTION_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_compression: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl IngestionConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, IngestionError> {
        let ingestion_url = env::var("DD_INGESTION_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_INGESTION_URL.to_string());
        let timeout = env::var("DD_INGESTION_TIMEOUT")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let use_compression = env::var("DD_INGESTION_USE_COMPRESSION")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);
        let compression_level = env::var("DD_INGESTION_COMPRESSION_LEVEL")
            .ok()
            .and_then(|level| level.parse::<i32>().ok())
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        let https_proxy = env::var("DD_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        let log_level = env::var("DD_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            ingestion_url,
            timeout,
            use_compression,
            compression_level,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), IngestionError> {
        let url = self.ingestion_url.trim();
        if url.is_empty() {
            return Err(IngestionError::InvalidConfig(
                "DD_INGESTION_URL cannot be empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(IngestionError::InvalidConfig(format!(
                "Invalid ingestion URL '{}'. Must start with http:// or https://",
                self.ingestion_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(IngestionError::InvalidConfig(
                "Ingestion timeout must be greater than 0".to_string(),
            ));
        }

        if !(1..=21).contains(&self.compression_level) {
            return Err(IngestionError::InvalidConfig(format!(
                "Invalid compression level {}. Must be between 1 and 21",
                self.compression_level
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(IngestionError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Full URL logs are posted to
    pub fn logs_url(&self) -> String {
        format!("{}/logs", self.ingestion_url.trim_end_matches('/'))
    }
}
