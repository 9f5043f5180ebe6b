//! In-memory key-value store
//!
//! Implements the full `KeyValueStore` port over a single mutex-guarded
//! map, including TTL bookkeeping and the atomic set-if-absent the leases
//! rely on. Expired keys are purged lazily on access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ports::{KeyValueStore, KvError};

#[derive(Debug, Clone)]
enum Value {
    String(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Stored {
    value: Value,
    expires_at: Option<Instant>,
}

impl Stored {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Single-process reference implementation of the KV port.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, Stored>>,
    unavailable: AtomicBool,
}

impl InMemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `KvError::Unavailable`, or
    /// restore service. For outage tests.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), KvError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }

    fn purge_if_expired(entries: &mut HashMap<String, Stored>, key: &str) {
        if entries.get(key).is_some_and(Stored::expired) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        match entries.get(key).map(|stored| &stored.value) {
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(Value::Hash(_)) => Err(KvError::Protocol(format!("{key} holds a hash"))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        self.check_available()?;
        self.entries.lock().insert(
            key.to_string(),
            Stored {
                value: Value::String(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Stored {
                value: Value::String(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        Ok(entries.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(stored) => {
                stored.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        Ok(entries
            .get(key)
            .and_then(|stored| stored.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        match entries.get(key).map(|stored| &stored.value) {
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::String(_)) => Err(KvError::Protocol(format!("{key} holds a string"))),
            None => Ok(HashMap::new()),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::purge_if_expired(&mut entries, key);
        let stored = entries.entry(key.to_string()).or_insert_with(|| Stored {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut stored.value {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Value::String(_) => Err(KvError::Protocol(format!("{key} holds a string"))),
        }
    }

    async fn hash_replace(
        &self,
        key: &str,
        fields: HashMap<String, String>,
        ttl: Option<Duration>,
    ) -> Result<(), KvError> {
        self.check_available()?;
        self.entries.lock().insert(
            key.to_string(),
            Stored {
                value: Value::Hash(fields),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        entries.retain(|_, stored| !stored.expired());
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_roundtrip_and_delete() {
        let kv = InMemoryKeyValueStore::new();
        kv.set("a", "1", None).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(kv.delete("a").await.unwrap());
        assert_eq!(kv.get("a").await.unwrap(), None);
        assert!(!kv.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_if_not_exists_is_exclusive() {
        let kv = InMemoryKeyValueStore::new();
        let ttl = Duration::from_secs(5);
        assert!(kv.set_if_not_exists("lease", "x", ttl).await.unwrap());
        assert!(!kv.set_if_not_exists("lease", "y", ttl).await.unwrap());
        assert_eq!(kv.get("lease").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_expired_key_reads_as_absent() {
        let kv = InMemoryKeyValueStore::new();
        kv.set("short", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(kv.get("short").await.unwrap(), None);
        assert!(kv
            .set_if_not_exists("short", "w", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_hash_operations() {
        let kv = InMemoryKeyValueStore::new();
        kv.hash_set("h", "f1", "v1").await.unwrap();
        kv.hash_set("h", "f2", "v2").await.unwrap();

        let all = kv.hash_get_all("h").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["f1"], "v1");

        let mut replacement = HashMap::new();
        replacement.insert("f3".to_string(), "v3".to_string());
        kv.hash_replace("h", replacement, None).await.unwrap();

        let all = kv.hash_get_all("h").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["f3"], "v3");
    }

    #[tokio::test]
    async fn test_type_confusion_is_a_protocol_error() {
        let kv = InMemoryKeyValueStore::new();
        kv.set("s", "v", None).await.unwrap();
        assert!(matches!(
            kv.hash_get_all("s").await,
            Err(KvError::Protocol(_))
        ));
        kv.hash_set("h", "f", "v").await.unwrap();
        assert!(matches!(kv.get("h").await, Err(KvError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_ttl_inspection() {
        let kv = InMemoryKeyValueStore::new();
        kv.set("persistent", "v", None).await.unwrap();
        assert_eq!(kv.time_to_live("persistent").await.unwrap(), None);

        kv.set("bounded", "v", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        let remaining = kv.time_to_live("bounded").await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_scan_keys_by_prefix() {
        let kv = InMemoryKeyValueStore::new();
        kv.hash_set("devAddrTable:000000AA", "f", "v").await.unwrap();
        kv.hash_set("devAddrTable:000000BB", "f", "v").await.unwrap();
        kv.set("fullUpdateKey", "v", None).await.unwrap();

        let mut keys = kv.scan_keys("devAddrTable:").await.unwrap();
        keys.sort();
        assert_eq!(keys, ["devAddrTable:000000AA", "devAddrTable:000000BB"]);
    }

    #[tokio::test]
    async fn test_injected_outage() {
        let kv = InMemoryKeyValueStore::new();
        kv.set_unavailable(true);
        assert!(matches!(
            kv.get("anything").await,
            Err(KvError::Unavailable(_))
        ));
        kv.set_unavailable(false);
        assert!(kv.get("anything").await.unwrap().is_none());
    }
}
