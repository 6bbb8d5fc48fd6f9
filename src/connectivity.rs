use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::Connectivity;
use crate::error::DashError;

/// Source of network reachability. `subscribe` yields a receiver that is
/// notified once per transition; dropping the receiver unsubscribes.
pub trait ConnectivityMonitor: Send + Sync + 'static {
    fn current(&self) -> Connectivity;
    fn subscribe(&self) -> watch::Receiver<Connectivity>;
}

impl<T: ConnectivityMonitor> ConnectivityMonitor for Arc<T> {
    fn current(&self) -> Connectivity {
        (**self).current()
    }

    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        (**self).subscribe()
    }
}

/// Monitor driven by the host, which reports reachability through `set`.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    state: Arc<watch::Sender<Connectivity>>,
}

impl SharedConnectivity {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns `true` when the call changed the state.
    pub fn set(&self, next: Connectivity) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            tracing::info!(state = %next, "connectivity changed");
        }
        changed
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(Connectivity::Unreachable)
    }
}

impl ConnectivityMonitor for SharedConnectivity {
    fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }
}

/// Reachability check against a single URL: any HTTP reply means reachable.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DashError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DashError::Network(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn check(&self) -> Connectivity {
        match self.client.head(&self.url).send().await {
            Ok(_) => Connectivity::Reachable,
            Err(err) => {
                tracing::debug!(url = %self.url, error = %err, "probe failed");
                Connectivity::Unreachable
            }
        }
    }

    /// Polls forever, feeding results into `target`. Abort the handle to stop.
    pub fn spawn(self, target: SharedConnectivity, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                target.set(self.check().await);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_only_transitions() {
        let shared = SharedConnectivity::new(Connectivity::Unreachable);
        let rx = shared.subscribe();
        assert!(!shared.set(Connectivity::Unreachable));
        assert!(!rx.has_changed().unwrap());
        assert!(shared.set(Connectivity::Reachable));
        assert!(rx.has_changed().unwrap());
        assert_eq!(shared.current(), Connectivity::Reachable);
    }
}
