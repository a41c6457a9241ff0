//! Connectivity state shared between the host application and the sync
//! layer.
//!
//! The monitor records observations; it never probes by itself. Feed it
//! from platform callbacks, or run a [`ReachabilityProbe`] against the
//! remote store.

use crate::remote::RemoteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Observable online/offline state.
///
/// A single boolean, no intermediate states. Subscribers are woken once per
/// actual transition and are never replayed the state current at subscribe
/// time. Cheap to clone; all clones share the channel.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    /// Latest observed state. Never blocks.
    #[must_use]
    pub fn current(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records an observation. Subscribers are notified only if the value
    /// actually changed; returns whether it did.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
        if changed {
            info!(
                "connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        changed
    }

    /// Subscribes to transitions. The value current at subscribe time is
    /// already marked seen; the receiver wakes only on later changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Periodically pings the remote store and feeds the result into a monitor.
///
/// Probe results that do not change the state notify nobody, so the cadence
/// bounds how often subscribers can be woken by this source.
pub struct ReachabilityProbe {
    remote: Arc<dyn RemoteStore>,
    monitor: ConnectivityMonitor,
    interval: Duration,
}

impl ReachabilityProbe {
    /// Creates a probe with the default 30 second cadence.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, monitor: ConnectivityMonitor) -> Self {
        Self {
            remote,
            monitor,
            interval: Duration::from_secs(30),
        }
    }

    /// Overrides the probe cadence.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the probe loop; the first probe fires immediately. Abort the
    /// handle to stop probing.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let reachable = self.remote.ping().await.is_ok();
                self.monitor.set_online(reachable);
            }
        })
    }
}
