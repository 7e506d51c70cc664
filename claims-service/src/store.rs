use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

// Redis dependencies (only used by Redis implementation)
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::StoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Redis,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Redis => "redis",
            StoreKind::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RedisStats {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_commands_processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreStats {
    Redis(RedisStats),
    Memory {
        connected: bool,
        stored_items: usize,
        cleaned_expired: usize,
    },
}

impl StoreStats {
    pub fn connected(&self) -> bool {
        match self {
            StoreStats::Redis(stats) => stats.connected,
            StoreStats::Memory { connected, .. } => *connected,
        }
    }
}

/// Live entries at a point in time, keyed without any backend namespace.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    pub entries: Vec<(String, String)>,
    pub cleaned_expired: usize,
}

/// Expiring string key/value store backing the staging area.
///
/// "Not found" is `Ok(None)`; `Err` is reserved for backend failures, which
/// callers are expected to log and degrade on rather than propagate.
#[async_trait]
pub trait KvStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Stores `value`, replacing any existing entry; unreadable once `ttl` has elapsed.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Removes the entry; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Reads and removes the entry.
    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.delete(key).await?;
        }
        Ok(value)
    }

    async fn stats(&self) -> StoreStats;

    /// Every live entry. Intended for debugging only.
    async fn snapshot(&self) -> StoreResult<StoreSnapshot>;
}

pub type SharedStore = Arc<dyn KvStore>;

// ---------------- Redis Implementation ----------------

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisStore {
    /// Opens a managed connection and confirms it with `PING`, both bounded by
    /// the configured timeout.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url())?;
        let mut manager = bounded(config.redis_timeout, ConnectionManager::new(client)).await?;
        let _: String = bounded(
            config.redis_timeout,
            redis::cmd("PING").query_async::<_, String>(&mut manager),
        )
        .await?;
        Ok(Self {
            manager,
            prefix: config.redis_prefix.clone(),
            timeout: config.redis_timeout,
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

async fn bounded<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Redis
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let redis_key = self.namespaced(key);
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1));
        bounded(self.timeout, cmd.query_async::<_, ()>(&mut conn)).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let redis_key = self.namespaced(key);
        let mut conn = self.manager.clone();
        bounded(self.timeout, conn.get::<_, Option<String>>(&redis_key)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let redis_key = self.namespaced(key);
        let mut conn = self.manager.clone();
        let _: i64 = bounded(self.timeout, conn.del::<_, i64>(&redis_key)).await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let redis_key = self.namespaced(key);
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().get(&redis_key).del(&redis_key);
        let (value, _removed): (Option<String>, i64) =
            bounded(self.timeout, pipe.query_async(&mut conn)).await?;
        Ok(value)
    }

    async fn stats(&self) -> StoreStats {
        let mut conn = self.manager.clone();
        let info = bounded(
            self.timeout,
            redis::cmd("INFO").query_async::<_, redis::InfoDict>(&mut conn),
        )
        .await;
        match info {
            Ok(info) => StoreStats::Redis(RedisStats {
                connected: true,
                used_memory: Some(
                    info.get::<String>("used_memory_human")
                        .unwrap_or_else(|| "N/A".to_string()),
                ),
                connected_clients: Some(info.get::<u64>("connected_clients").unwrap_or(0)),
                total_commands_processed: Some(
                    info.get::<u64>("total_commands_processed").unwrap_or(0),
                ),
                error: None,
            }),
            Err(err) => {
                warn!(error = %err, "Failed to read Redis INFO");
                StoreStats::Redis(RedisStats {
                    connected: false,
                    error: Some(err.to_string()),
                    ..RedisStats::default()
                })
            }
        }
    }

    async fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", self.prefix);
        let mut keys: Vec<String> =
            bounded(self.timeout, conn.keys::<_, Vec<String>>(&pattern)).await?;
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for redis_key in keys {
            // Keys can expire between KEYS and GET.
            let value: Option<String> =
                bounded(self.timeout, conn.get::<_, Option<String>>(&redis_key)).await?;
            if let Some(value) = value {
                let key = redis_key
                    .strip_prefix(self.prefix.as_str())
                    .unwrap_or(redis_key.as_str())
                    .to_string();
                entries.push((key, value));
            }
        }
        Ok(StoreSnapshot {
            entries,
            cleaned_expired: 0,
        })
    }
}

// ---------------- In-Memory Implementation (Fallback) ----------------

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Process-local store used when Redis is unreachable.
///
/// Expiry is lazy: entries past their ttl are dropped when touched by
/// `get`/`take` and purged wholesale by `stats`/`snapshot`. There is no
/// background sweeper.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn purge_expired(map: &mut HashMap<String, MemoryEntry>, now: Instant) -> usize {
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    before - map.len()
}

#[async_trait]
impl KvStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut guard = self.inner.lock().await;
        guard.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                inserted_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        if guard.get(key).is_some_and(|entry| entry.is_expired(now)) {
            guard.remove(key);
        }
        Ok(guard.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut guard = self.inner.lock().await;
        guard.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        match guard.remove(key) {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }

    async fn stats(&self) -> StoreStats {
        let mut guard = self.inner.lock().await;
        let cleaned_expired = purge_expired(&mut guard, Instant::now());
        StoreStats::Memory {
            connected: true,
            stored_items: guard.len(),
            cleaned_expired,
        }
    }

    async fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let mut guard = self.inner.lock().await;
        let cleaned_expired = purge_expired(&mut guard, Instant::now());
        let mut entries: Vec<(String, String)> = guard
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();
        entries.sort();
        Ok(StoreSnapshot {
            entries,
            cleaned_expired,
        })
    }
}

// ---------------- Backend selection ----------------

/// Outcome of the one-time startup probe.
pub enum StoreInit {
    Redis(RedisStore),
    Fallback { store: MemoryStore, reason: StoreError },
}

impl StoreInit {
    pub fn kind(&self) -> StoreKind {
        match self {
            StoreInit::Redis(_) => StoreKind::Redis,
            StoreInit::Fallback { .. } => StoreKind::Memory,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        match self {
            StoreInit::Redis(store) => Arc::new(store),
            StoreInit::Fallback { store, .. } => Arc::new(store),
        }
    }
}

/// Connects to Redis, falling back to [`MemoryStore`] when it is unreachable.
pub async fn init_store(config: &StoreConfig) -> StoreInit {
    match RedisStore::connect(config).await {
        Ok(store) => {
            info!(
                host = %config.redis_host,
                port = config.redis_port,
                db = config.redis_db,
                "Connected to Redis"
            );
            StoreInit::Redis(store)
        }
        Err(reason) => {
            warn!(
                error = %reason,
                host = %config.redis_host,
                port = config.redis_port,
                "Redis connection failed; falling back to in-memory storage"
            );
            StoreInit::Fallback {
                store: MemoryStore::new(),
                reason,
            }
        }
    }
}
