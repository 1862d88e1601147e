use super::{CollectionData, CollectionStore};
use crate::error::EngineError;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, Vec<String>>,
    collections: BTreeMap<(String, String), CollectionData>,
}

/// Process-local [`CollectionStore`] for tests and scratch sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one document.
    pub fn with_document(doc_id: &str, blocks: Vec<String>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.documents.insert(doc_id.to_string(), blocks);
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::StorageMessage("memory store lock poisoned".to_string()))
    }
}

impl CollectionStore for MemoryStore {
    fn load_document(&self, doc_id: &str) -> Result<Option<Vec<String>>, EngineError> {
        Ok(self.lock()?.documents.get(doc_id).cloned())
    }

    fn put_document(&self, doc_id: &str, blocks: &[String]) -> Result<(), EngineError> {
        self.lock()?
            .documents
            .insert(doc_id.to_string(), blocks.to_vec());
        Ok(())
    }

    fn load_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
    ) -> Result<Option<CollectionData>, EngineError> {
        Ok(self
            .lock()?
            .collections
            .get(&(doc_id.to_string(), coll_id.to_string()))
            .cloned())
    }

    fn save_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
        data: &CollectionData,
    ) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        if !inner.documents.contains_key(doc_id) {
            return Err(EngineError::NotFound(format!("document '{}'", doc_id)));
        }
        inner
            .collections
            .insert((doc_id.to_string(), coll_id.to_string()), data.clone());
        Ok(())
    }

    fn list_collections(&self, doc_id: &str) -> Result<Vec<String>, EngineError> {
        Ok(self
            .lock()?
            .collections
            .keys()
            .filter(|(doc, _)| doc == doc_id)
            .map(|(_, coll)| coll.clone())
            .collect())
    }

    fn delete_collection(&self, doc_id: &str, coll_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .lock()?
            .collections
            .remove(&(doc_id.to_string(), coll_id.to_string()))
            .is_some())
    }
}
