use super::{Body, Document, DocumentStore, Expect, Filter, MergePatch, StoreError};
use crate::utils::clock::{Clock, SystemClock};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Key = (String, String);

/// Process-local store used for tests and `STORE_BACKEND=memory` runs.
/// Every merge happens under one write lock, so it is atomic per document.
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<Key, Document>>,
    clock: Arc<dyn Clock>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Seed or replace a document wholesale, bumping its version
    pub fn insert(&self, collection: &str, id: &str, body: Body) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let key = (collection.to_string(), id.to_string());
        let version = docs.get(&key).map(|d| d.version + 1).unwrap_or(1);
        docs.insert(
            key,
            Document {
                id: id.to_string(),
                version,
                body,
            },
        );
        Ok(version)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        let mut found: Vec<Document> = docs
            .iter()
            .filter(|((c, _), d)| c == collection && filters.iter().all(|f| f.matches(&d.body)))
            .map(|(_, d)| d.clone())
            .collect();
        // HashMap order is arbitrary; keep results stable
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &MergePatch,
        expect: Expect,
    ) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let key = (collection.to_string(), id.to_string());
        let current = docs.get(&key);

        if !expect.admits(current.map(|d| d.version)) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let (mut body, version) = match current {
            Some(d) => (d.body.clone(), d.version + 1),
            None => (Body::new(), 1),
        };
        patch.apply(&mut body, self.clock.now());

        docs.insert(
            key,
            Document {
                id: id.to_string(),
                version,
                body,
            },
        );
        Ok(version)
    }
}
