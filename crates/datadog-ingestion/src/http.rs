// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport for log batches.
//!
//! Every send is serialized to JSON, optionally zstd compressed, and posted
//! from a task spawned on the provided tokio runtime. The returned call aborts
//! that task, which also drops its completion callback.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use reqwest::RequestBuilder;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};
use zstd::stream::write::Encoder;

use crate::config::IngestionConfig;
use crate::error::IngestionError;
use crate::ingestion::{CallResult, IngestionClient, ServiceCall, ServiceCallback};
use crate::models::{Destination, IngestionResponse, LogContainer};

pub const APP_SECRET_HEADER: &str = "App-Secret";
pub const INSTALL_ID_HEADER: &str = "Install-ID";

/// [`IngestionClient`] posting log batches to `<ingestion_url>/logs`.
///
/// Completion callbacks run on the runtime's worker threads.
#[derive(Debug)]
pub struct HttpIngestion {
    client: reqwest::Client,
    config: Arc<IngestionConfig>,
    runtime: Handle,
    closed: AtomicBool,
}

impl HttpIngestion {
    /// Validates `config` and builds the HTTP client. Requests are spawned on
    /// `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidConfig`] for an invalid configuration
    /// or proxy URL.
    pub fn new(config: Arc<IngestionConfig>, runtime: Handle) -> Result<Self, IngestionError> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            client,
            config,
            runtime,
            closed: AtomicBool::new(false),
        })
    }

    /// Whether [`IngestionClient::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn create_request(
        &self,
        destination: &Destination,
        payload: &LogContainer,
    ) -> Result<RequestBuilder, IngestionError> {
        let body = serde_json::to_vec(payload)?;
        let mut request = self
            .client
            .post(self.config.logs_url())
            .header(APP_SECRET_HEADER, destination.app_secret.as_str())
            .header(INSTALL_ID_HEADER, destination.install_id.to_string())
            .header("Content-Type", "application/json");

        let body = if self.config.use_compression {
            request = request.header("Content-Encoding", "zstd");
            self.encode(&body)?
        } else {
            body
        };
        Ok(request.body(body))
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, IngestionError> {
        let mut encoder = Encoder::new(Vec::new(), self.config.compression_level)
            .map_err(|e| IngestionError::Compression(e.to_string()))?;
        encoder
            .write_all(data)
            .map_err(|e| IngestionError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| IngestionError::Compression(e.to_string()))
    }

    async fn execute(request: RequestBuilder) -> CallResult {
        let time = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(
                "Failed to reach ingestion endpoint after {} ms: {e}",
                time.elapsed().as_millis()
            );
            IngestionError::from(e)
        })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read ingestion response body ({status}): {e}");
                String::new()
            }
        };
        if status.is_success() {
            debug!(
                "Logs ingested with status {status} in {} ms",
                time.elapsed().as_millis()
            );
            Ok(IngestionResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            error!("{status}: Failed to push logs to ingestion endpoint: {body:?}");
            Err(IngestionError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}

struct HttpServiceCall {
    task: AbortHandle,
}

impl ServiceCall for HttpServiceCall {
    fn cancel(&self) {
        if !self.task.is_finished() {
            debug!("Aborting in-flight ingestion request");
        }
        self.task.abort();
    }
}

impl IngestionClient for HttpIngestion {
    fn send(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        let request = if self.is_closed() {
            Err(IngestionError::Closed)
        } else {
            self.create_request(&destination, &payload)
        };

        let task = self.runtime.spawn(async move {
            let result = match request {
                Ok(request) => Self::execute(request).await,
                Err(e) => Err(e),
            };
            callback(result);
        });

        Box::new(HttpServiceCall {
            task: task.abort_handle(),
        })
    }

    fn close(&self) -> Result<(), IngestionError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("HTTP ingestion closed");
        }
        Ok(())
    }
}

fn build_client(config: &IngestionConfig) -> Result<reqwest::Client, IngestionError> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout);
    if let Some(proxy) = &config.https_proxy {
        let proxy = reqwest::Proxy::https(proxy.as_str())
            .map_err(|e| IngestionError::InvalidConfig(format!("Invalid HTTPS proxy: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| IngestionError::Runtime(format!("Failed to build HTTP client: {e}")))
}
