// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Network-state aware decorator around an [`IngestionClient`].
//!
//! While the network is down, sends are parked in a FIFO table instead of
//! being forwarded. When connectivity comes back, the parked calls are
//! replayed once, in submission order. Every call can be cancelled at any
//! point of its life:
//!
//! ```text
//!   send ──> Queued ──(network up)──> Dispatching ──> InFlight ──> completed
//!              │                          │              │
//!              └────────── cancel ────────┴──────────────┴──> cancelled
//! ```
//!
//! The table and the connectivity flag live under a single mutex. The lock is
//! never held while calling into the wrapped client or into a caller's
//! callback, so the wrapped client is free to complete synchronously from
//! inside `send`.

use std::collections::BTreeMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::error::IngestionError;
use crate::ingestion::{CallResult, IngestionClient, ServiceCall, ServiceCallback};
use crate::models::{Destination, LogContainer};
use crate::network::{NetworkStateListener, NetworkStateSource};

/// Identity of a call, assigned in submission order.
pub type CallId = u64;

struct PendingRequest {
    destination: Destination,
    payload: Arc<LogContainer>,
}

enum CallState {
    /// Waiting for connectivity. Owns the request until it is dispatched.
    Queued(PendingRequest),
    /// Taken for dispatch; the wrapped client has not returned its handle yet.
    Dispatching,
    InFlight(Box<dyn ServiceCall>),
    /// Cancelled while `Dispatching`. The dispatcher removes the entry and
    /// cancels the underlying call once it gets the handle.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Queued,
    Dispatching,
    InFlight,
    Cancelled,
}

struct PendingCall {
    callback: Option<ServiceCallback>,
    state: CallState,
}

impl PendingCall {
    fn phase(&self) -> Phase {
        match self.state {
            CallState::Queued(_) => Phase::Queued,
            CallState::Dispatching => Phase::Dispatching,
            CallState::InFlight(_) => Phase::InFlight,
            CallState::Cancelled => Phase::Cancelled,
        }
    }
}

struct CallTable {
    connected: bool,
    /// Set while one thread replays the queue; other up transitions leave
    /// the remaining calls to it.
    draining: bool,
    next_id: CallId,
    calls: BTreeMap<CallId, PendingCall>,
}

/// Shared call table. Completion wrappers hold it strongly, caller handles
/// only weakly.
struct CallRegistry {
    table: Mutex<CallTable>,
}

impl CallRegistry {
    fn new(connected: bool) -> Self {
        Self {
            table: Mutex::new(CallTable {
                connected,
                draining: false,
                next_id: 1,
                calls: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CallTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the underlying handle of a call that was just forwarded.
    fn record_dispatched(&self, id: CallId, call: Box<dyn ServiceCall>) {
        let mut table = self.lock();
        match table.calls.get(&id).map(PendingCall::phase) {
            Some(Phase::Dispatching) => {
                if let Some(entry) = table.calls.get_mut(&id) {
                    entry.state = CallState::InFlight(call);
                }
            }
            Some(Phase::Cancelled) => {
                let removed = table.calls.remove(&id);
                drop(table);
                debug!("Call {id} was cancelled during dispatch, forwarding cancel");
                call.cancel();
                drop(removed);
            }
            Some(phase) => {
                drop(table);
                warn!("Call {id} dispatched while {phase:?}, ignoring handle");
            }
            None => {
                // Completed before the wrapped client returned.
                drop(table);
                debug!("Call {id} completed during dispatch");
            }
        }
    }

    /// Completion wrapper target: hands the result to the caller unless the
    /// call was cancelled or is unknown.
    fn complete(&self, id: CallId, result: CallResult) {
        let mut table = self.lock();
        let removed = match table.calls.get(&id).map(PendingCall::phase) {
            Some(Phase::Dispatching | Phase::InFlight) => table.calls.remove(&id),
            _ => None,
        };
        drop(table);

        match removed.and_then(|mut call| call.callback.take()) {
            Some(callback) => {
                match &result {
                    Ok(response) => debug!("Call {id} succeeded with status {}", response.status),
                    Err(e) => debug!("Call {id} failed: {e}"),
                }
                callback(result);
            }
            None => debug!("Dropping completion of call {id}: cancelled or unknown"),
        }
    }

    fn cancel(&self, id: CallId) {
        let mut table = self.lock();
        match table.calls.get(&id).map(PendingCall::phase) {
            None | Some(Phase::Cancelled) => {
                drop(table);
                debug!("Cancel of call {id} ignored: no longer pending");
            }
            Some(Phase::Dispatching) => {
                let callback = table.calls.get_mut(&id).and_then(|entry| {
                    entry.state = CallState::Cancelled;
                    entry.callback.take()
                });
                drop(table);
                drop(callback);
                debug!("Call {id} cancelled while being dispatched");
            }
            Some(Phase::Queued | Phase::InFlight) => {
                let removed = table.calls.remove(&id);
                drop(table);
                if let Some(PendingCall {
                    state: CallState::InFlight(call),
                    ..
                }) = removed
                {
                    debug!("Forwarding cancel of in-flight call {id}");
                    call.cancel();
                } else {
                    debug!("Cancelled queued call {id}");
                }
            }
        }
    }

    fn is_pending(&self, id: CallId) -> bool {
        matches!(
            self.lock().calls.get(&id).map(PendingCall::phase),
            Some(Phase::Queued | Phase::Dispatching | Phase::InFlight)
        )
    }
}

/// Cancellable handle returned for every send made through a
/// [`NetworkStateHandler`].
///
/// The handle does not own the call; once the call completes, is cancelled,
/// or the handler goes away, `cancel` does nothing.
#[derive(Debug, Clone)]
pub struct PendingCallHandle {
    id: CallId,
    registry: Weak<CallRegistry>,
}

impl PendingCallHandle {
    /// Identity of the call. Ids grow in submission order, so comparing two
    /// ids tells which call was sent first.
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Whether the call is still queued or in flight.
    pub fn is_pending(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_pending(self.id))
    }
}

impl ServiceCall for PendingCallHandle {
    fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.cancel(self.id);
        }
    }
}

/// Decorator that queues sends while offline and replays them on reconnect.
///
/// It registers itself as the listener of the given [`NetworkStateSource`]
/// for its whole lifetime (until [`IngestionClient::close`]).
pub struct NetworkStateHandler<C> {
    client: C,
    network: Arc<dyn NetworkStateSource>,
    registry: Arc<CallRegistry>,
    listener: Weak<dyn NetworkStateListener>,
}

impl<C: IngestionClient + 'static> NetworkStateHandler<C> {
    /// Wraps `client` and starts following `network`.
    ///
    /// The handler registers itself as a weak listener of `network` and then
    /// re-reads its state once, so a transition that happened while it was
    /// being built is not missed.
    pub fn new(client: C, network: Arc<dyn NetworkStateSource>) -> Arc<Self> {
        let connected = network.is_network_connected();
        let handler = Arc::new_cyclic(|weak: &Weak<Self>| {
            let listener: Weak<dyn NetworkStateListener> = weak.clone();
            Self {
                client,
                network,
                registry: Arc::new(CallRegistry::new(connected)),
                listener,
            }
        });

        handler.network.add_listener(handler.listener.clone());
        // Catch a transition that happened between the first read and registration.
        let connected = handler.network.is_network_connected();
        handler.on_network_state_updated(connected);

        debug!(
            "Network state handler created (connected={})",
            handler.is_network_connected()
        );
        handler
    }

    /// Sends now if the network is up, otherwise queues the call.
    ///
    /// Never fails; the outcome is only observable through `callback`.
    pub fn send_call(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> PendingCallHandle {
        let request = PendingRequest {
            destination,
            payload,
        };
        let (id, immediate) = {
            let mut table = self.registry.lock();
            let id = table.next_id;
            table.next_id += 1;

            let (state, immediate) = if table.connected {
                (CallState::Dispatching, Some(request))
            } else {
                (CallState::Queued(request), None)
            };
            table.calls.insert(
                id,
                PendingCall {
                    callback: Some(callback),
                    state,
                },
            );
            (id, immediate)
        };

        match immediate {
            Some(request) => self.dispatch(id, request),
            None => debug!("Network is down, queued call {id}"),
        }

        PendingCallHandle {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn dispatch(&self, id: CallId, request: PendingRequest) {
        debug!(
            "Dispatching call {id} with {} log(s)",
            request.payload.len()
        );
        let registry = Arc::clone(&self.registry);
        let wrapper: ServiceCallback = Box::new(move |result| registry.complete(id, result));
        let call = self
            .client
            .send(request.destination, request.payload, wrapper);
        self.registry.record_dispatched(id, call);
    }

    /// Forwards queued calls, oldest first, until none is left or the network
    /// drops again. Remaining calls stay queued for the next transition.
    ///
    /// Only the thread that set `draining` runs this.
    fn replay(&self) {
        let queued = self.queued_count();
        if queued > 0 {
            info!("Network is up, replaying {queued} queued call(s)");
        }

        let mut cursor: CallId = 0;
        let mut replayed = 0usize;
        loop {
            let (id, request) = {
                let mut table = self.registry.lock();
                if !table.connected {
                    table.draining = false;
                    info!("Network lost during replay, {replayed} call(s) replayed");
                    return;
                }
                let next = table
                    .calls
                    .range(cursor..)
                    .find(|(_, call)| call.phase() == Phase::Queued)
                    .map(|(id, _)| *id);
                let Some(id) = next else {
                    table.draining = false;
                    break;
                };
                cursor = id + 1;
                let Some(entry) = table.calls.get_mut(&id) else {
                    continue;
                };
                match mem::replace(&mut entry.state, CallState::Dispatching) {
                    CallState::Queued(request) => (id, request),
                    previous => {
                        entry.state = previous;
                        continue;
                    }
                }
            };
            self.dispatch(id, request);
            replayed += 1;
        }
        if replayed > 0 {
            debug!("Replay finished, {replayed} call(s) replayed");
        }
    }

    /// Connectivity as last applied by the handler.
    pub fn is_network_connected(&self) -> bool {
        self.registry.lock().connected
    }

    /// Number of calls that are queued or in flight.
    pub fn pending_count(&self) -> usize {
        self.registry
            .lock()
            .calls
            .values()
            .filter(|call| call.phase() != Phase::Cancelled)
            .count()
    }

    /// Number of calls waiting for connectivity.
    pub fn queued_count(&self) -> usize {
        self.registry
            .lock()
            .calls
            .values()
            .filter(|call| call.phase() == Phase::Queued)
            .count()
    }
}

impl<C: IngestionClient + 'static> NetworkStateListener for NetworkStateHandler<C> {
    /// Applies the source's current state. Notifications can arrive late or
    /// out of order, so `notified` is only used for logging.
    fn on_network_state_updated(&self, notified: bool) {
        let connected = self.network.is_network_connected();
        if connected != notified {
            debug!(
                "Stale network notification (connected={notified}), source reports {connected}"
            );
        }

        let start_replay = {
            let mut table = self.registry.lock();
            if table.connected == connected {
                return;
            }
            table.connected = connected;
            let start_replay = connected && !table.draining;
            if start_replay {
                table.draining = true;
            }
            start_replay
        };

        if start_replay {
            self.replay();
        } else if connected {
            debug!("Network is up, queued calls are already being replayed");
        } else {
            info!("Network is down, new calls will be queued");
        }
    }
}

impl<C: IngestionClient + 'static> IngestionClient for NetworkStateHandler<C> {
    fn send(
        &self,
        destination: Destination,
        payload: Arc<LogContainer>,
        callback: ServiceCallback,
    ) -> Box<dyn ServiceCall> {
        Box::new(self.send_call(destination, payload, callback))
    }

    /// Stops listening to the network and closes the wrapped client. Pending
    /// calls are left untouched.
    fn close(&self) -> Result<(), IngestionError> {
        self.network.remove_listener(&self.listener);
        let pending = self.pending_count();
        if pending > 0 {
            warn!("Closing ingestion with {pending} call(s) still pending");
        }
        self.client.close()
    }
}

impl<C> std::fmt::Debug for NetworkStateHandler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.registry.lock();
        f.debug_struct("NetworkStateHandler")
            .field("connected", &table.connected)
            .field("calls", &table.calls.len())
            .finish()
    }
}
