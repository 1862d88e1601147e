//! Core engine library for annotext (ranges, decorations, layout, history, storage).

/// Reversible editor actions.
pub mod action;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Decoration model and id generation.
pub mod decoration;
/// Engine error types.
pub mod error;
/// Undo/redo history.
pub mod history;
/// Span-tree layout of decorated blocks.
pub mod layout;
/// Range algebra over block text.
pub mod range;
/// Open collection session (state + history).
pub mod session;
/// Editor state owned by a session.
pub mod state;
/// Per-collection statistics.
pub mod stats;
/// Persistence collaborators.
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use action::{
    AcceptHint, ActionCategory, ActionId, ActionMeta, ActionSummary, AddDecorations, Checkpoint,
    ClearBlockDecorations, Preparation, RemoveDecorations, ReversibleAction, SetSel, SetSelMethod,
};
pub use config::EngineConfig;
pub use decoration::{
    Annotation, Decorated, Decoration, DecorationId, DecorationKind, DecorationSet, Hint,
    HintAccept, IdGenerator, Slot,
};
pub use error::EngineError;
pub use history::History;
pub use layout::{find_children, find_parent, layout, SpanKind, SpanNode, SpanTree};
pub use range::Range;
pub use session::Session;
pub use state::EditorState;
pub use stats::DocStats;
pub use store::{CollectionData, CollectionStore, MemoryStore, RedbStore};
