use std::collections::HashMap;
use std::sync::RwLock;

use super::storage::{SessionStorage, StorageError};

/// Process-local storage. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw entries, bypassing the session store (for tests and migrations).
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl SessionStorage for MemoryStorage {
    async fn get_many(
        &self,
        keys: &'static [&'static str],
    ) -> Result<Vec<Option<String>>, StorageError> {
        let entries = self.entries.read().map_err(|_| "memory storage lock poisoned")?;
        Ok(keys.iter().map(|k| entries.get(*k).cloned()).collect())
    }

    async fn write_batch(
        &self,
        batch: Vec<(&'static str, Option<String>)>,
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| "memory storage lock poisoned")?;
        for (key, value) in batch {
            match value {
                Some(v) => entries.insert(key.to_owned(), v),
                None => entries.remove(key),
            };
        }
        Ok(())
    }
}
