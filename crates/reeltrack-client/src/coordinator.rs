//! Catalog mutations and the remote item counter.
//!
//! Every mutation runs under one lock covering the catalog write and the
//! counter calls that follow it, so two removals cannot interleave their
//! replays. The catalog write always completes before the first counter call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use metrics::counter;
use reeltrack_core::protocol::TOTAL_ITEMS;
use reeltrack_core::{CatalogError, CatalogItem, CatalogStore, NewItem};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarClient, DEFAULT_DATE_FORMAT};
use crate::counter::CounterClient;
use crate::error::ServiceError;

/// How the counter is brought back to the catalog size after a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// `reset` followed by one `increment` per remaining item. Self-healing:
    /// earlier lost or duplicated increments are corrected.
    #[default]
    Replay,
    /// One `set` call carrying the new size. Needs a counter service that
    /// understands `set`.
    Absolute,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Replay => f.write_str("replay"),
            SyncStrategy::Absolute => f.write_str("absolute"),
        }
    }
}

impl FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replay" => Ok(SyncStrategy::Replay),
            "absolute" | "set" => Ok(SyncStrategy::Absolute),
            other => Err(format!("unknown sync strategy: {other}")),
        }
    }
}

/// What happened to the remote counter after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CounterSync {
    /// The counter matches the catalog size.
    Synced { count: u64 },
    /// The counter could not be brought to `expected`; it is left as is.
    Drift { expected: u64, detail: String },
    /// Catalog size did not change, no counter call was made.
    Skipped,
}

impl CounterSync {
    pub fn is_drift(&self) -> bool {
        matches!(self, CounterSync::Drift { .. })
    }
}

/// A catalog mutation that succeeded, plus the counter outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<T> {
    pub value: T,
    pub counter: CounterSync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterStatus {
    pub count: u64,
    pub catalog_size: u64,
    pub in_sync: bool,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub counter_name: String,
    pub strategy: SyncStrategy,
    pub date_format: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            counter_name: TOTAL_ITEMS.to_string(),
            strategy: SyncStrategy::Replay,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

pub struct CatalogCoordinator {
    store: Arc<dyn CatalogStore>,
    counter: CounterClient,
    calendar: CalendarClient,
    config: CoordinatorConfig,
    mutation: Mutex<()>,
}

impl CatalogCoordinator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        counter: CounterClient,
        calendar: CalendarClient,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            counter,
            calendar,
            config,
            mutation: Mutex::new(()),
        }
    }

    pub fn counter_name(&self) -> &str {
        &self.config.counter_name
    }

    pub fn items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        self.store.list()
    }

    /// Appends the item, then increments the counter.
    pub async fn add_item(&self, draft: NewItem) -> Result<Mutation<CatalogItem>, CatalogError> {
        let _guard = self.mutation.lock().await;

        let date_added = self.calendar.date_or_placeholder(&self.config.date_format).await;
        let item = self.store.append(draft, date_added)?;
        let size = self.store.count()? as u64;
        info!(id = item.id, title = %item.title, size, "item added");

        let counter = match self.config.strategy {
            SyncStrategy::Replay => match self.counter.increment(&self.config.counter_name).await {
                Ok(count) if count == size => CounterSync::Synced { count },
                Ok(count) => self.drift(size, format!("counter reports {count} after increment")),
                Err(err) => self.drift(size, format!("increment failed: {err}")),
            },
            SyncStrategy::Absolute => self.set_absolute(size).await,
        };

        Ok(Mutation {
            value: item,
            counter,
        })
    }

    /// Removes the item. The counter is only touched when a row was actually
    /// deleted, which under the mutation lock shrinks the catalog by one.
    pub async fn remove_item(&self, id: u64) -> Result<Mutation<bool>, CatalogError> {
        let _guard = self.mutation.lock().await;

        let before = self.store.count()?;
        if !self.store.remove(id)? {
            debug!(id, "remove matched no item, counter untouched");
            return Ok(Mutation {
                value: false,
                counter: CounterSync::Skipped,
            });
        }

        let remaining = before.saturating_sub(1);
        info!(id, remaining, "item removed");
        let counter = self.sync_to(remaining as u64).await;
        Ok(Mutation {
            value: true,
            counter,
        })
    }

    /// Progress does not change the catalog size, so no counter call is made.
    pub async fn update_progress(&self, id: u64, progress: u32) -> Result<CatalogItem, CatalogError> {
        let _guard = self.mutation.lock().await;
        self.store.update_progress(id, progress)
    }

    /// Recomputes the counter from the current catalog size.
    pub async fn resync(&self) -> Result<CounterSync, CatalogError> {
        let _guard = self.mutation.lock().await;
        let size = self.store.count()? as u64;
        info!(size, strategy = %self.config.strategy, "resynchronizing counter");
        Ok(self.sync_to(size).await)
    }

    /// Compares the remote counter with the catalog. Waits for any in-flight
    /// mutation so a half-finished replay is never reported as drift.
    pub async fn counter_status(&self) -> Result<CounterStatus, CoordinatorError> {
        let _guard = self.mutation.lock().await;
        let catalog_size = self.store.count()? as u64;
        let count = self.counter.get(&self.config.counter_name).await?;
        Ok(CounterStatus {
            count,
            catalog_size,
            in_sync: count == catalog_size,
        })
    }

    async fn sync_to(&self, expected: u64) -> CounterSync {
        match self.config.strategy {
            SyncStrategy::Replay => self.replay(expected).await,
            SyncStrategy::Absolute => self.set_absolute(expected).await,
        }
    }

    /// `reset` then exactly `expected` increments. Stops at the first failure
    /// and leaves the counter under-counted.
    async fn replay(&self, expected: u64) -> CounterSync {
        let name = &self.config.counter_name;
        if let Err(err) = self.counter.reset(name).await {
            return self.drift(expected, format!("reset failed: {err}"));
        }

        let mut count = 0;
        for step in 0..expected {
            counter!("reeltrack_counter_replay_calls_total").increment(1);
            match self.counter.increment(name).await {
                Ok(value) => count = value,
                Err(err) => {
                    return self.drift(
                        expected,
                        format!("replay stopped after {step} of {expected} increments: {err}"),
                    );
                }
            }
        }

        if count == expected {
            CounterSync::Synced { count }
        } else {
            self.drift(expected, format!("counter reports {count} after replay"))
        }
    }

    async fn set_absolute(&self, expected: u64) -> CounterSync {
        match self.counter.set(&self.config.counter_name, expected).await {
            Ok(count) if count == expected => CounterSync::Synced { count },
            Ok(count) => self.drift(expected, format!("counter reports {count} after set")),
            Err(err) => self.drift(expected, format!("set failed: {err}")),
        }
    }

    fn drift(&self, expected: u64, detail: String) -> CounterSync {
        counter!("reeltrack_counter_drift_total").increment(1);
        warn!(counter = %self.config.counter_name, expected, %detail, "counter drifted from catalog");
        CounterSync::Drift { expected, detail }
    }
}
