//! Time-bucketed, single-flight result cache
//!
//! Every cached unit is addressed by (source id, bucket key), where the
//! bucket key is the trigger time truncated to the source's granularity.
//! Concurrent requests for the same key collapse into one producer execution;
//! failures are never cached, so the next caller retries the producer.
//!
//! When a root directory is configured, successful entries are also persisted
//! as `<root>/<source_id>/<bucket_key>.json` and survive process restarts.

use crate::error::FetchError;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Cache bucket granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One bucket per hour
    Hour,
    /// One bucket per day
    Day,
}

/// Deterministic bucket key for a trigger time.
///
/// Trigger times within the same boundary interval map to the same key;
/// crossing an hour or day boundary yields a different key.
pub fn bucket_key(trigger_time: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Hour => trigger_time.format("%Y%m%d%H").to_string(),
        Granularity::Day => trigger_time.format("%Y%m%d").to_string(),
    }
}

/// One immutable cached unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source identifier owning the partition
    pub source_id: String,
    /// Bucket key the payload was computed for
    pub bucket_key: String,
    /// The computed payload
    pub payload: serde_json::Value,
    /// Computation timestamp, for diagnostics
    pub computed_at: DateTime<Utc>,
}

type Key = (String, String);
type FlightFuture = Shared<BoxFuture<'static, Result<serde_json::Value, FetchError>>>;

struct Inner {
    root: Option<PathBuf>,
    entries: RwLock<HashMap<Key, CacheEntry>>,
    flights: Mutex<HashMap<Key, FlightFuture>>,
}

impl Inner {
    fn entry_path(&self, key: &Key) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(&key.0).join(format!("{}.json", key.1)))
    }

    async fn load_from_disk(&self, key: &Key) -> Option<CacheEntry> {
        let path = self.entry_path(key)?;
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.bucket_key == key.1 => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Discarding unreadable cache file {:?}: {}", path, e);
                None
            }
        }
    }

    async fn persist(&self, key: &Key, entry: &CacheEntry) {
        let Some(path) = self.entry_path(key) else {
            return;
        };
        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let bytes = serde_json::to_vec_pretty(entry).map_err(std::io::Error::other)?;
            tokio::fs::write(&path, bytes).await
        }
        .await;

        // Persistence is best-effort; the in-memory entry stays authoritative
        if let Err(e) = result {
            warn!("Failed to persist cache entry {:?}: {}", path, e);
        }
    }

    async fn store(&self, key: Key, entry: CacheEntry) {
        self.persist(&key, &entry).await;
        self.entries.write().await.insert(key, entry);
    }
}

/// Time-bucketed, single-flight result cache shared by all data sources.
///
/// Constructed once at process start with an explicit root location and
/// passed by reference to every adapter and the orchestrator; no globals.
pub struct CacheStore {
    inner: Arc<Inner>,
}

impl Clone for CacheStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CacheStore {
    /// Create a new cache store; `root` enables on-disk persistence
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                root,
                entries: RwLock::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Look up a live entry, consulting disk on a memory miss
    async fn lookup(&self, key: &Key) -> Option<serde_json::Value> {
        if let Some(entry) = self.inner.entries.read().await.get(key) {
            return Some(entry.payload.clone());
        }

        if let Some(entry) = self.inner.load_from_disk(key).await {
            let payload = entry.payload.clone();
            self.inner
                .entries
                .write()
                .await
                .insert(key.clone(), entry);
            return Some(payload);
        }

        None
    }

    /// Return the cached payload for (source, bucket) or compute it once.
    ///
    /// Concurrent callers for the same key share a single producer execution
    /// and receive the same result or the same failure. Failures leave no
    /// entry behind, so a subsequent call retries the producer.
    pub async fn get_or_compute<F, Fut>(
        &self,
        source_id: &str,
        trigger_time: NaiveDateTime,
        granularity: Granularity,
        producer: F,
    ) -> Result<serde_json::Value, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<serde_json::Value, FetchError>> + Send + 'static,
    {
        let key: Key = (source_id.to_string(), bucket_key(trigger_time, granularity));

        if let Some(payload) = self.lookup(&key).await {
            debug!("Cache hit for {}/{}", key.0, key.1);
            return Ok(payload);
        }

        let flight = {
            let mut flights = self.inner.flights.lock().await;

            // A racing caller may have finished while we waited for the lock
            if let Some(entry) = self.inner.entries.read().await.get(&key) {
                return Ok(entry.payload.clone());
            }

            if let Some(existing) = flights.get(&key) {
                debug!("Joining in-flight computation for {}/{}", key.0, key.1);
                existing.clone()
            } else {
                debug!("Cache miss for {}/{}, computing", key.0, key.1);
                let inner = Arc::clone(&self.inner);
                let flight_key = key.clone();
                let fut = producer();
                let flight: FlightFuture = async move {
                    let result = async {
                        let payload = fut.await?;
                        let entry = CacheEntry {
                            source_id: flight_key.0.clone(),
                            bucket_key: flight_key.1.clone(),
                            payload: payload.clone(),
                            computed_at: Utc::now(),
                        };
                        inner.store(flight_key.clone(), entry).await;
                        Ok(payload)
                    }
                    .await;

                    // The flight removes itself exactly once on completion.
                    // Waiters must not touch the map: a slow waiter of a
                    // failed flight would otherwise delete a successor
                    // flight started by a faster retry, letting two
                    // producers run for the same key. Successes are served
                    // from the entry map, failures must be retried by the
                    // next caller.
                    inner.flights.lock().await.remove(&flight_key);

                    result
                }
                .boxed()
                .shared();
                flights.insert(key.clone(), flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Whether a live entry exists for (source, bucket)
    pub async fn contains(
        &self,
        source_id: &str,
        trigger_time: NaiveDateTime,
        granularity: Granularity,
    ) -> bool {
        let key: Key = (source_id.to_string(), bucket_key(trigger_time, granularity));
        self.lookup(&key).await.is_some()
    }

    /// Number of entries held in memory
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    /// Whether the in-memory cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
