// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Network reachability boundary.
//!
//! Platform glue reports connectivity through [`NetworkStateHelper`] (or any
//! other [`NetworkStateSource`]); consumers register a [`NetworkStateListener`]
//! to be told about transitions.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, info};

/// Receives connectivity transitions.
pub trait NetworkStateListener: Send + Sync {
    /// Called after the source changed state. Updates may be delivered late
    /// when several happen at once; re-read the source for the current value.
    fn on_network_state_updated(&self, connected: bool);
}

/// Point-in-time connectivity query plus transition subscription.
///
/// Listeners are held weakly so that a source never keeps a consumer alive.
pub trait NetworkStateSource: Send + Sync {
    /// Current reachability.
    fn is_network_connected(&self) -> bool;
    /// Starts notifying `listener`. Registering the same listener twice has
    /// no effect.
    fn add_listener(&self, listener: Weak<dyn NetworkStateListener>);
    fn remove_listener(&self, listener: &Weak<dyn NetworkStateListener>);
}

#[derive(Default)]
struct HelperState {
    connected: bool,
    listeners: Vec<Weak<dyn NetworkStateListener>>,
}

/// Connectivity source fed by the host application.
///
/// Listeners are only notified on actual transitions, and always outside the
/// helper's own lock so they are free to query it again.
#[derive(Default)]
pub struct NetworkStateHelper {
    state: Mutex<HelperState>,
}

impl NetworkStateHelper {
    /// Creates a helper starting in the given state, with no listeners.
    pub fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HelperState {
                connected,
                listeners: Vec::new(),
            }),
        })
    }

    /// Records the new connectivity and notifies listeners when it changed.
    pub fn set_network_connected(&self, connected: bool) {
        let listeners: Vec<Arc<dyn NetworkStateListener>> = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.connected == connected {
                debug!("Network state unchanged (connected={connected})");
                return;
            }
            state.connected = connected;
            state.listeners.retain(|listener| listener.strong_count() > 0);
            state.listeners.iter().filter_map(Weak::upgrade).collect()
        };

        info!(
            "Network state changed: connected={connected}, notifying {} listener(s)",
            listeners.len()
        );
        for listener in listeners {
            listener.on_network_state_updated(connected);
        }
    }

    /// Number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .listeners
            .iter()
            .filter(|listener| listener.strong_count() > 0)
            .count()
    }
}

impl NetworkStateSource for NetworkStateHelper {
    fn is_network_connected(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connected
    }

    fn add_listener(&self, listener: Weak<dyn NetworkStateListener>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.listeners.iter().any(|l| l.ptr_eq(&listener)) {
            state.listeners.push(listener);
        }
    }

    fn remove_listener(&self, listener: &Weak<dyn NetworkStateListener>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.listeners.retain(|l| !l.ptr_eq(listener));
    }
}

impl std::fmt::Debug for NetworkStateHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkStateHelper")
            .field("connected", &self.is_network_connected())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingListener {
        updates: Mutex<Vec<bool>>,
    }

    impl NetworkStateListener for RecordingListener {
        fn on_network_state_updated(&self, connected: bool) {
            self.updates.lock().unwrap().push(connected);
        }
    }

    fn register(helper: &NetworkStateHelper, listener: &Arc<RecordingListener>) {
        let as_dyn: Arc<dyn NetworkStateListener> = listener.clone();
        helper.add_listener(Arc::downgrade(&as_dyn));
    }

    #[test]
    fn test_initial_state() {
        assert!(NetworkStateHelper::new(true).is_network_connected());
        assert!(!NetworkStateHelper::new(false).is_network_connected());
    }

    #[test]
    fn test_notifies_only_on_transitions() {
        let helper = NetworkStateHelper::new(false);
        let listener = Arc::new(RecordingListener::default());
        register(&helper, &listener);

        helper.set_network_connected(false);
        helper.set_network_connected(true);
        helper.set_network_connected(true);
        helper.set_network_connected(false);

        assert_eq!(*listener.updates.lock().unwrap(), vec![true, false]);
        assert!(!helper.is_network_connected());
    }

    #[test]
    fn test_remove_listener() {
        let helper = NetworkStateHelper::new(false);
        let listener = Arc::new(RecordingListener::default());
        let as_dyn: Arc<dyn NetworkStateListener> = listener.clone();
        let weak = Arc::downgrade(&as_dyn);
        helper.add_listener(weak.clone());
        assert_eq!(helper.listener_count(), 1);

        helper.remove_listener(&weak);
        assert_eq!(helper.listener_count(), 0);

        helper.set_network_connected(true);
        assert!(listener.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let helper = NetworkStateHelper::new(false);
        let listener = Arc::new(RecordingListener::default());
        register(&helper, &listener);
        register(&helper, &listener);
        assert_eq!(helper.listener_count(), 1);

        helper.set_network_connected(true);
        assert_eq!(*listener.updates.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        struct CountingListener(Arc<AtomicUsize>);
        impl NetworkStateListener for CountingListener {
            fn on_network_state_updated(&self, _connected: bool) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let helper = NetworkStateHelper::new(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let listener: Arc<dyn NetworkStateListener> =
            Arc::new(CountingListener(Arc::clone(&calls)));
        helper.add_listener(Arc::downgrade(&listener));
        drop(listener);

        assert_eq!(helper.listener_count(), 0);
        helper.set_network_connected(true);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
