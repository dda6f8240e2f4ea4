// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Datadog Ingestion
//!
//! Log ingestion for hosts with intermittent connectivity.
//!
//! ## Overview
//!
//! - [`ingestion`]: the asynchronous [`IngestionClient`] contract and its cancellable calls
//! - [`http`]: HTTP transport posting log batches to the ingestion endpoint
//! - [`network`]: connectivity reporting and transition listeners
//! - [`network_state_handler`]: decorator that queues sends while offline and
//!   replays them, in order, once the network is back
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use datadog_ingestion::{
//!     Destination, HttpIngestion, IngestionClient, IngestionConfig, LogContainer,
//!     NetworkStateHandler, NetworkStateHelper, ServiceCall,
//! };
//!
//! # fn run(runtime: tokio::runtime::Handle) -> Result<(), datadog_ingestion::IngestionError> {
//! let config = Arc::new(IngestionConfig::from_env()?);
//! let network = NetworkStateHelper::new(false);
//! let handler = NetworkStateHandler::new(HttpIngestion::new(config, runtime)?, network.clone());
//!
//! let call = handler.send(
//!     Destination::new("app-secret", uuid::Uuid::new_v4()),
//!     Arc::new(LogContainer::default()),
//!     Box::new(|result| println!("{result:?}")),
//! );
//!
//! // Queued until the host reports connectivity.
//! network.set_network_connected(true);
//! call.cancel();
//! handler.close()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod http;
pub mod ingestion;
pub mod logger;
pub mod models;
pub mod network;
pub mod network_state_handler;

pub use config::IngestionConfig;
pub use error::IngestionError;
pub use http::HttpIngestion;
pub use ingestion::{CallResult, IngestionClient, ServiceCall, ServiceCallback};
pub use models::{Destination, IngestionResponse, LogContainer};
pub use network::{NetworkStateHelper, NetworkStateListener, NetworkStateSource};
pub use network_state_handler::{CallId, NetworkStateHandler, PendingCallHandle};
