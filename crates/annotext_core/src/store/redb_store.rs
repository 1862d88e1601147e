//! [`CollectionStore`] backed by redb.

use super::tables::{COLLECTIONS, DOCUMENTS};
use super::{CollectionData, CollectionStore};
use crate::error::EngineError;
use redb::{ReadableDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;

/// redb database holding documents and collections.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<redb::Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create the database file at `path` and its tables.
    ///
    /// # Errors
    /// Returns an error when the file cannot be opened or tables cannot be
    /// initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    EngineError::StorageMessage(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        err
                    ))
                })?;
            }
        }

        let db = redb::Database::create(path)?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(DOCUMENTS)?;
        write_txn.open_table(COLLECTIONS)?;
        write_txn.commit()?;
        tracing::debug!("Opened annotext store at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }
}

impl CollectionStore for RedbStore {
    fn load_document(&self, doc_id: &str) -> Result<Option<Vec<String>>, EngineError> {
        let read_txn = self.db.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        match documents.get(doc_id)? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_document(&self, doc_id: &str, blocks: &[String]) -> Result<(), EngineError> {
        let encoded = bincode::serialize(blocks)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            documents.insert(doc_id, encoded.as_slice())?;
        }
        write_txn.commit()?;
        tracing::info!(doc_id, blocks = blocks.len(), "stored document");
        Ok(())
    }

    fn load_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
    ) -> Result<Option<CollectionData>, EngineError> {
        let read_txn = self.db.begin_read()?;
        let collections = read_txn.open_table(COLLECTIONS)?;
        match collections.get((doc_id, coll_id))? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    fn save_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
        data: &CollectionData,
    ) -> Result<(), EngineError> {
        let encoded = bincode::serialize(data)?;
        let write_txn = self.db.begin_write()?;
        {
            let documents = write_txn.open_table(DOCUMENTS)?;
            if documents.get(doc_id)?.is_none() {
                return Err(EngineError::NotFound(format!("document '{}'", doc_id)));
            }
            let mut collections = write_txn.open_table(COLLECTIONS)?;
            collections.insert((doc_id, coll_id), encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_collections(&self, doc_id: &str) -> Result<Vec<String>, EngineError> {
        let read_txn = self.db.begin_read()?;
        let collections = read_txn.open_table(COLLECTIONS)?;
        let mut ids = Vec::new();
        for item in collections.iter()? {
            let (key, _) = item?;
            let (row_doc, row_coll) = key.value();
            if row_doc == doc_id {
                ids.push(row_coll.to_string());
            }
        }
        Ok(ids)
    }

    fn delete_collection(&self, doc_id: &str, coll_id: &str) -> Result<bool, EngineError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut collections = write_txn.open_table(COLLECTIONS)?;
            let removed = collections.remove((doc_id, coll_id))?.is_some();
            removed
        };
        write_txn.commit()?;
        if removed {
            tracing::info!(doc_id, coll_id, "deleted collection");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::decoration::{Annotation, DecorationId, DecorationKind, Slot};
    use crate::range::Range;
    use crate::store::{CollectionData, CollectionStore};
    use crate::test_support::setup_temp_store;

    fn sample() -> CollectionData {
        CollectionData {
            annotations: vec![Annotation::annotate_range(
                DecorationId::new(DecorationKind::Annotation, 1),
                "Person",
                Range::new(0, 0, 3),
            )],
            slots: vec![Slot::new(
                DecorationId::new(DecorationKind::Slot, 1),
                Range::new(0, 0, 4),
                "sentence",
            )],
            hints: Vec::new(),
        }
    }

    #[test]
    fn documents_and_collections_persist() {
        let (store, _dir) = setup_temp_store();
        store
            .put_document("doc", &["Bob。".to_string()])
            .expect("put document");
        assert_eq!(
            store.load_document("doc").expect("load"),
            Some(vec!["Bob。".to_string()])
        );
        assert_eq!(store.load_document("missing").expect("load"), None);

        store.save_collection("doc", "main", &sample()).expect("save");
        assert_eq!(
            store.load_collection("doc", "main").expect("load"),
            Some(sample())
        );
        assert_eq!(store.load_collection("doc", "other").expect("load"), None);
    }

    #[test]
    fn save_requires_known_document() {
        let (store, _dir) = setup_temp_store();
        let err = store
            .save_collection("ghost", "main", &CollectionData::default())
            .expect_err("unknown document");
        assert!(matches!(err, crate::EngineError::NotFound(_)));
    }

    #[test]
    fn list_and_delete_collections_are_scoped_to_document() {
        let (store, _dir) = setup_temp_store();
        for doc in ["a", "b"] {
            store.put_document(doc, &["x".to_string()]).expect("put");
        }
        store.save_collection("a", "two", &sample()).expect("save");
        store.save_collection("a", "one", &sample()).expect("save");
        store.save_collection("b", "three", &sample()).expect("save");

        assert_eq!(store.list_collections("a").expect("list"), vec!["one", "two"]);
        assert!(store.delete_collection("a", "one").expect("delete"));
        assert!(!store.delete_collection("a", "one").expect("delete again"));
        assert_eq!(store.list_collections("a").expect("list"), vec!["two"]);
        assert_eq!(store.list_collections("b").expect("list"), vec!["three"]);
    }
}
