use redb::TableDefinition;

/// Document rows (`Vec<String>` blocks, bincode-encoded).
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
/// Collection rows keyed by `(doc_id, coll_id)` (`CollectionData`, bincode-encoded).
pub const COLLECTIONS: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("collections");
