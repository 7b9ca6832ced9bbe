use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// String key-value storage for small client state such as the cycle setup.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Inserts or overwrites every entry, or none of them.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local store. Stands in for SQLite when the database file cannot
/// be opened; nothing outlives the process.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("in-memory store poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.entries()?;
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_overwrites_and_delete_forgets() {
        let store = InMemoryStore::new();
        assert!(store.get("cycleLength").await.unwrap().is_none());

        store.set_many(&[("cycleLength", "28")]).await.unwrap();
        store.set_many(&[("cycleLength", "30")]).await.unwrap();
        assert_eq!(store.get("cycleLength").await.unwrap().as_deref(), Some("30"));

        store.delete("cycleLength").await.unwrap();
        store.delete("never-set").await.unwrap();
        assert!(store.get("cycleLength").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_many_writes_every_entry() {
        let store = InMemoryStore::new();
        store
            .set_many(&[("lastPeriodDate", "2025-01-01"), ("cycleLength", "31")])
            .await
            .unwrap();

        assert_eq!(
            store.get("lastPeriodDate").await.unwrap().as_deref(),
            Some("2025-01-01")
        );
        assert_eq!(store.get("cycleLength").await.unwrap().as_deref(), Some("31"));
    }
}
