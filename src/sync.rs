//! Registry sync: rebuilds registry snapshots from the tool store.
//!
//! A single actor task owns the watermark and the rebuild step. Scheduled
//! ticks and forced refreshes both arrive at that task, so refresh cycles
//! never overlap while registry readers stay fully concurrent.
//!
//! Every cycle that detects a change republishes the *entire* enabled set;
//! there is no incremental patching of a live snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::store::ToolStore;
use crate::tools::{RegistrySnapshot, ToolDefinition, ToolRegistry};
use crate::types::{Error, Result, SyncConfig};

/// Result of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing changed since the watermark; registry untouched.
    Unchanged,
    /// A full snapshot was rebuilt and published.
    Published {
        tools: usize,
        skipped: usize,
        watermark: DateTime<Utc>,
    },
}

/// Last known state of the sync actor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub watermark: DateTime<Utc>,
    pub tools: usize,
    pub last_published_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            // `DateTime::default()` is the Unix epoch.
            watermark: DateTime::<Utc>::default(),
            tools: 0,
            last_published_at: None,
            last_error: None,
        }
    }
}

/// Owns the refresh watermark and performs rebuilds.
pub struct RegistrySync {
    store: Arc<dyn ToolStore>,
    registry: Arc<ToolRegistry>,
    watermark: DateTime<Utc>,
    last_published: Option<RefreshOutcome>,
}

impl std::fmt::Debug for RegistrySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySync")
            .field("watermark", &self.watermark)
            .field("tools", &self.registry.len())
            .finish()
    }
}

impl RegistrySync {
    pub fn new(store: Arc<dyn ToolStore>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            store,
            registry,
            watermark: DateTime::<Utc>::default(),
            last_published: None,
        }
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// Scheduled refresh: no-op unless some row changed after the watermark.
    pub async fn tick(&mut self) -> Result<RefreshOutcome> {
        self.refresh(false).await
    }

    /// On-demand refresh: always rebuilds.
    pub async fn force_refresh(&mut self) -> Result<RefreshOutcome> {
        self.refresh(true).await
    }

    async fn refresh(&mut self, force: bool) -> Result<RefreshOutcome> {
        if !force {
            let changed = self.store.list_changed_since(self.watermark).await?;
            if changed.is_empty() {
                return Ok(RefreshOutcome::Unchanged);
            }
            tracing::debug!("registry_changes_detected: {} row(s)", changed.len());
        }

        let rows = self.store.list_enabled().await?;
        let mut snapshot = RegistrySnapshot::new();
        let mut skipped = 0;
        let mut newest = self.watermark;

        for row in rows {
            match ToolDefinition::parse(&row.config_json, &row.name) {
                Ok(definition) => {
                    let name = definition.name.clone();
                    if snapshot.insert(definition).is_some() {
                        tracing::warn!(tool = %name, row = row.id, "duplicate tool name, later row wins");
                    }
                    // Only parsed rows move the watermark, so a broken row
                    // is fetched again on every cycle until it is fixed.
                    if row.updated_at > newest {
                        newest = row.updated_at;
                    }
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(tool = %row.name, row = row.id, "skipping unparseable tool row: {}", e);
                }
            }
        }

        let tools = snapshot.len();
        self.registry.replace(snapshot);
        self.watermark = newest;

        let outcome = RefreshOutcome::Published {
            tools,
            skipped,
            watermark: newest,
        };
        // A row held back by the watermark rebuilds the same snapshot on
        // every tick; only a different outcome is worth an info line.
        if self.note_published(&outcome) {
            tracing::info!(tools, skipped, forced = force, watermark = %newest, "registry_refreshed");
        } else {
            tracing::debug!(tools, skipped, forced = force, watermark = %newest, "registry_refreshed");
        }
        Ok(outcome)
    }

    /// Record a published outcome; true when it differs from the last one.
    fn note_published(&mut self, outcome: &RefreshOutcome) -> bool {
        let changed = self.last_published.as_ref() != Some(outcome);
        self.last_published = Some(outcome.clone());
        changed
    }

    /// Start the actor. Returns a handle for forced refreshes and status,
    /// and the task's join handle. The first scheduled tick fires at once.
    pub fn spawn(
        mut self,
        config: &SyncConfig,
        cancel: CancellationToken,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (signal_tx, mut signal_rx) = mpsc::channel(config.signal_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());
        let interval = config.refresh_interval.max(std::time::Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("registry_sync_stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let result = self.tick().await;
                        self.report(&status_tx, &result);
                    }
                    Some(signal) = signal_rx.recv() => {
                        let (result, reply) = match signal {
                            SyncSignal::Tick(reply) => (self.tick().await, reply),
                            SyncSignal::Force(reply) => (self.force_refresh().await, reply),
                        };
                        self.report(&status_tx, &result);
                        // Requester may have given up waiting.
                        let _ = reply.send(result);
                    }
                }
            }
        });

        (
            SyncHandle {
                signals: signal_tx,
                status: status_rx,
            },
            task,
        )
    }

    fn report(&self, status_tx: &watch::Sender<SyncStatus>, result: &Result<RefreshOutcome>) {
        match result {
            Ok(RefreshOutcome::Unchanged) => {}
            Ok(RefreshOutcome::Published { tools, watermark, .. }) => {
                status_tx.send_modify(|status| {
                    status.watermark = *watermark;
                    status.tools = *tools;
                    status.last_published_at = Some(Utc::now());
                    status.last_error = None;
                });
            }
            Err(e) => {
                tracing::error!("registry_refresh_failed: {}", e);
                let message = e.to_string();
                status_tx.send_modify(|status| status.last_error = Some(message));
            }
        }
    }
}

#[derive(Debug)]
enum SyncSignal {
    Tick(oneshot::Sender<Result<RefreshOutcome>>),
    Force(oneshot::Sender<Result<RefreshOutcome>>),
}

/// Cloneable handle to a running sync actor.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    signals: mpsc::Sender<SyncSignal>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Rebuild now and wait for the cycle to finish.
    pub async fn force_refresh(&self) -> Result<RefreshOutcome> {
        self.request(SyncSignal::Force).await
    }

    /// Run a change-detecting cycle now and wait for it.
    pub async fn tick(&self) -> Result<RefreshOutcome> {
        self.request(SyncSignal::Tick).await
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    async fn request(
        &self,
        make: fn(oneshot::Sender<Result<RefreshOutcome>>) -> SyncSignal,
    ) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.signals
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::internal("registry sync is not running"))?;
        reply_rx
            .await
            .map_err(|_| Error::internal("registry sync stopped before replying"))?
    }
}
