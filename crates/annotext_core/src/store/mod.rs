//! Persistence of documents and their decoration collections.

mod memory;
mod redb_store;
/// redb table definitions.
pub mod tables;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::decoration::{Annotation, Hint, Slot};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Decorations persisted for one `(document, collection)` pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionData {
    pub annotations: Vec<Annotation>,
    pub slots: Vec<Slot>,
    pub hints: Vec<Hint>,
}

/// Storage collaborator for documents and collections.
///
/// Implementations must be safe to share between the engine and task workers.
pub trait CollectionStore: Send + Sync {
    /// Blocks of a stored document, `None` when the document is unknown.
    ///
    /// # Errors
    /// Returns an error when storage access or decoding fails.
    fn load_document(&self, doc_id: &str) -> Result<Option<Vec<String>>, EngineError>;

    /// Create or replace a document.
    ///
    /// # Errors
    /// Returns an error when storage access or encoding fails.
    fn put_document(&self, doc_id: &str, blocks: &[String]) -> Result<(), EngineError>;

    /// Stored collection, `None` when it was never saved.
    ///
    /// # Errors
    /// Returns an error when storage access or decoding fails.
    fn load_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
    ) -> Result<Option<CollectionData>, EngineError>;

    /// Create or replace a collection. Returning `Ok` is the acknowledgement.
    ///
    /// # Errors
    /// Returns an error when storage access or encoding fails.
    fn save_collection(
        &self,
        doc_id: &str,
        coll_id: &str,
        data: &CollectionData,
    ) -> Result<(), EngineError>;

    /// Collection ids stored for `doc_id`, sorted.
    ///
    /// # Errors
    /// Returns an error when storage access fails.
    fn list_collections(&self, doc_id: &str) -> Result<Vec<String>, EngineError>;

    /// Delete a collection. Returns `true` when a row was removed.
    ///
    /// # Errors
    /// Returns an error when storage access fails.
    fn delete_collection(&self, doc_id: &str, coll_id: &str) -> Result<bool, EngineError>;
}
