//! Shared test-only helpers for annotext_core.

use crate::store::RedbStore;
use tempfile::TempDir;

/// Creates an isolated temporary redb store and returns it with the temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing file.
///
/// # Panics
/// Panics if temp-dir creation or store initialization fails.
pub(crate) fn setup_temp_store() -> (RedbStore, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = RedbStore::open(temp_dir.path().join("test.redb")).expect("store");
    (store, temp_dir)
}
