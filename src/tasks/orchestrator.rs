//! Connectivity-aware orchestrator
//!
//! Owns the startup state machine (`Uninitialized -> Initializing -> Ready`)
//! and the independent online/offline flag. Coming back online drains the
//! outbox and refreshes cached data; a store that cannot be opened puts the
//! cache in degraded mode instead of failing startup.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cache::OfflineCache;
use crate::error::Result;
use crate::models::{ActionPayload, DrainReport, PendingAction, StatusResponse};
use crate::tasks::populate::{populate, PopulateReport};

// == Lifecycle ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready => "ready",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a submitted action.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Accepted by the backend right away
    Sent(PendingAction),
    /// Stored in the outbox for a later drain
    Queued(PendingAction),
}

impl SubmitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitOutcome::Sent(_) => "sent",
            SubmitOutcome::Queued(_) => "queued",
        }
    }

    pub fn action(&self) -> &PendingAction {
        match self {
            SubmitOutcome::Sent(action) | SubmitOutcome::Queued(action) => action,
        }
    }
}

// == Orchestrator ==
#[derive(Debug)]
pub struct Orchestrator {
    cache: Arc<OfflineCache>,
    probe_timeout: Duration,
    lifecycle: watch::Sender<Lifecycle>,
    online: watch::Sender<bool>,
}

impl Orchestrator {
    /// Starts offline and uninitialized.
    pub fn new(cache: Arc<OfflineCache>, probe_timeout: Duration) -> Self {
        Self {
            cache,
            probe_timeout,
            lifecycle: watch::channel(Lifecycle::Uninitialized).0,
            online: watch::channel(false).0,
        }
    }

    pub fn cache(&self) -> &Arc<OfflineCache> {
        &self.cache
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn subscribe_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// True once startup is over while the store is still not open.
    ///
    /// Clears as soon as any later operation manages to open the store.
    pub fn is_degraded(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready && !self.cache.store().is_initialized()
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            lifecycle: self.lifecycle().to_string(),
            online: self.is_online(),
            degraded: self.is_degraded(),
        }
    }

    // == Start ==
    /// First-load sequence. Only the first call does anything.
    ///
    /// Opens the store, then probes the backend before any bulk fetch. A
    /// failed probe leaves the cache offline and skips populate. A failed
    /// store open leaves the cache degraded until a later open succeeds.
    /// Either way the lifecycle ends at `Ready`.
    pub async fn start(&self) {
        let claimed = self.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Uninitialized {
                *state = Lifecycle::Initializing;
                true
            } else {
                false
            }
        });
        if !claimed {
            return;
        }

        match self.cache.init().await {
            Ok(()) => {
                let reachable = self.probe().await;
                self.set_online(reachable).await;
            }
            Err(e) => error!("Offline cache unavailable, continuing without it: {}", e),
        }

        self.lifecycle.send_replace(Lifecycle::Ready);
        info!(
            "Offline cache ready (online: {}, degraded: {})",
            self.is_online(),
            self.is_degraded()
        );
    }

    /// Bounded-time reachability check. Never errors.
    pub async fn probe(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.cache.backend().probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Connectivity probe failed: {}", e);
                false
            }
            Err(_) => {
                warn!("Connectivity probe timed out after {:?}", self.probe_timeout);
                false
            }
        }
    }

    // == Connectivity ==
    /// Records a connectivity change. Going from offline to online drains the
    /// outbox and then repopulates.
    pub async fn set_online(&self, online: bool) {
        let was_online = self.online.send_replace(online);
        match (was_online, online) {
            (false, true) => {
                info!("Connection restored");
                self.on_reconnect().await;
            }
            (true, false) => info!("Connection lost, working offline"),
            _ => {}
        }
    }

    /// Probes once and applies the result. While online, anything still
    /// queued is retried on this tick.
    pub async fn check_connectivity(&self) -> bool {
        let was_online = self.is_online();
        let reachable = self.probe().await;
        self.set_online(reachable).await;

        if was_online && reachable && self.cache.store().is_initialized() {
            match self.cache.outbox().is_empty().await {
                Ok(false) => {
                    self.drain().await;
                }
                Ok(true) => {}
                Err(e) => warn!("Could not read outbox: {}", e),
            }
        }
        reachable
    }

    async fn on_reconnect(&self) {
        // Retries a store that failed to open earlier
        if let Err(e) = self.cache.init().await {
            warn!("Skipping outbox drain and populate: {}", e);
            return;
        }
        self.drain().await;
        self.populate().await;
    }

    /// Drains the outbox, logging instead of failing.
    pub async fn drain(&self) -> Option<DrainReport> {
        match self.cache.drain_pending_actions().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Outbox drain failed: {}", e);
                None
            }
        }
    }

    pub async fn populate(&self) -> PopulateReport {
        populate(&self.cache, self.cache.settings().fetch_timeout).await
    }

    // == Submit Action ==
    /// Sends a user action now if possible, otherwise queues it.
    ///
    /// While anything is already queued, new actions join the queue so the
    /// backend sees them in submit order. A transient send failure falls
    /// back to the queue; a permanent rejection is returned to the caller.
    pub async fn submit_action(&self, payload: ActionPayload) -> Result<SubmitOutcome> {
        let outbox = self.cache.outbox();
        if !self.is_online() {
            return Ok(SubmitOutcome::Queued(outbox.enqueue(payload).await?));
        }

        let backlog = match outbox.is_empty().await {
            Ok(empty) => !empty,
            Err(e) => {
                warn!("Outbox unavailable, sending directly: {}", e);
                false
            }
        };
        if backlog {
            let action = outbox.enqueue(payload).await?;
            self.drain().await;
            return Ok(SubmitOutcome::Queued(action));
        }

        let action = outbox.stage(payload)?;
        match self.cache.backend().replay(&action).await {
            Ok(()) => Ok(SubmitOutcome::Sent(action)),
            Err(e) if e.is_permanent() => Err(e.into()),
            Err(e) => {
                warn!("Sending {} failed, queueing it: {}", action.id, e);
                outbox.push(&action).await?;
                Ok(SubmitOutcome::Queued(action))
            }
        }
    }
}
