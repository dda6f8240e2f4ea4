// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock ingestion clients and callback recorders

use datadog_ingestion::{
    CallResult, Destination, IngestionClient, IngestionError, IngestionResponse, LogContainer,
    ServiceCall, ServiceCallback,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

pub fn destination() -> Destination {
    Destination::new("test-app-secret", Uuid::new_v4())
}

/// Single-log payload tagged with `name`, so dispatch order can be checked.
pub fn payload(name: &str) -> Arc<LogContainer> {
    Arc::new(LogContainer::new(vec![json!({ "name": name })]))
}

pub fn success() -> CallResult {
    Ok(IngestionResponse {
        status: 202,
        body: "accepted".to_string(),
    })
}

/// Handle returned by the mocks; counts how often it was cancelled.
pub struct MockCall {
    cancels: Arc<AtomicUsize>,
}

impl ServiceCall for MockCall {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordedSend {
    payload: Arc<LogContainer>,
    callback: Option<ServiceCallback>,
    cancels: Arc<AtomicUsize>,
}

/// Records every send and holds on to its completion until the test
/// decides how the call ends.
#[derive(Default)]
pub struct RecordingClient {
    sends: Mutex<Vec<RecordedSend>>,
    closes: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    /// Payload names in the order the sends were received.
    pub fn sent_names(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|send| send.payload.logs[0]["name"].as_str().unwrap().to_string())
            .collect()
    }

    /// Finishes the `index`-th send. Returns false if it was already finished.
    pub fn complete(&self, index: usize, result: CallResult) -> bool {
        let callback = self.sends.lock().unwrap()[index].callback.take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }

    pub fn complete_all(&self) {
        for index in 0..self.send_count() {
            self.complete(index, success());
        }
    }

    pub fn cancel_count(&self, index: usize) -> usize {
        self.sends.lock().unwrap()[index]
            .cancels
            .load(Ordering::SeqCst)
    }

    pub fn total_cancels(&self) -> usize {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|send| send.cancels.load(Ordering::SeqCst))
            .sum()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl IngestionClient for RecordingClient {
    fn send(
        &self,
        _destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        let cancels = Arc::new(AtomicUsize::new(0));
        self.sends.lock().unwrap().push(RecordedSend {
            payload,
            callback: Some(callback),
            cancels: Arc::clone(&cancels),
        });
        Box::new(MockCall { cancels })
    }

    fn close(&self) -> Result<(), IngestionError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Completes every send successfully from a background thread after
/// `delay`, whether or not the call was cancelled in the meantime.
#[allow(dead_code)]
pub struct DelayedClient {
    delay: Duration,
    pub sends: AtomicUsize,
    pub cancels: Arc<AtomicUsize>,
    pub completions: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl DelayedClient {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            sends: AtomicUsize::new(0),
            cancels: Arc::new(AtomicUsize::new(0)),
            completions: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl IngestionClient for DelayedClient {
    fn send(
        &self,
        _destination: Destination,
        _payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let completions = Arc::clone(&self.completions);
        thread::spawn(move || {
            thread::sleep(delay);
            completions.fetch_add(1, Ordering::SeqCst);
            callback(success());
        });
        Box::new(MockCall {
            cancels: Arc::clone(&self.cancels),
        })
    }

    fn close(&self) -> Result<(), IngestionError> {
        Ok(())
    }
}

/// Collects every result handed to the callbacks it creates.
#[derive(Clone, Default)]
pub struct CallbackRecorder {
    results: Arc<Mutex<Vec<CallResult>>>,
}

#[allow(dead_code)]
impl CallbackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> ServiceCallback {
        let results = Arc::clone(&self.results);
        Box::new(move |result| results.lock().unwrap().push(result))
    }

    pub fn count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn success_count(&self) -> usize {
        self.results
            .lock()
            .unwrap()
            .iter()
            .filter(|result| result.is_ok())
            .count()
    }

    pub fn take(&self) -> Vec<CallResult> {
        std::mem::take(&mut *self.results.lock().unwrap())
    }
}
