//! Shared constants used across annotext crates.

/// Default number of undo entries retained by a session.
pub const DEFAULT_HISTORY_LIMIT: usize = 1_000;

/// Default capacity of the interaction broadcast channel.
pub const DEFAULT_INTERACTION_CAPACITY: usize = 1_024;

/// Default sentence delimiters used by the segmentation task.
pub const DEFAULT_CUT_LIST: &str = "。！？\n";

/// Slot type produced by sentence segmentation.
pub const SENTENCE_SLOT_TYPE: &str = "sentence";

/// Confidence assigned to annotations created by a user or an accepted hint.
pub const DEFAULT_ANNOTATION_CONFIDENCE: f64 = 1.0;

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "annotext.redb";
