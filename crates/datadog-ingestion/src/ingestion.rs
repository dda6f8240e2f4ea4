// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous ingestion client contract.
//!
//! Both the HTTP transport and the network-state aware decorator implement
//! [`IngestionClient`], so the decorator can be dropped in wherever a plain
//! client is expected.

use std::sync::Arc;

use crate::error::IngestionError;
use crate::models::{Destination, IngestionResponse, LogContainer};

/// Outcome delivered to a [`ServiceCallback`].
pub type CallResult = Result<IngestionResponse, IngestionError>;

/// Completion callback for a single send. Implementations invoke it at most
/// once, from whichever thread finishes the call.
pub type ServiceCallback = Box<dyn FnOnce(CallResult) + Send + 'static>;

/// Handle to an outstanding call.
pub trait ServiceCall: Send + Sync {
    /// Cancels the call. Calling it more than once, or after completion, has
    /// no further effect.
    fn cancel(&self);
}

pub trait IngestionClient: Send + Sync {
    /// Sends `payload` to `destination` without blocking.
    ///
    /// `callback` receives exactly one result unless the returned call is
    /// cancelled first.
    fn send(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall>;

    /// Releases the client's resources. Closing twice is not an error.
    fn close(&self) -> Result<(), IngestionError>;
}

impl<C: IngestionClient + ?Sized> IngestionClient for Arc<C> {
    fn send(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        (**self).send(destination, payload, callback)
    }

    fn close(&self) -> Result<(), IngestionError> {
        (**self).close()
    }
}

impl<C: IngestionClient + ?Sized> IngestionClient for Box<C> {
    fn send(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        (**self).send(destination, payload, callback)
    }

    fn close(&self) -> Result<(), IngestionError> {
        (**self).close()
    }
}
