//! Editor state owned by an open collection session.
//!
//! Readers receive clones; the only `&mut EditorState` handed out is the one
//! passed to [`crate::ReversibleAction::next`] and
//! [`crate::ReversibleAction::prev`] by the session.

use crate::decoration::{
    Annotation, Decorated, Decoration, DecorationId, DecorationKind, DecorationSet, Hint, Slot,
};
use crate::error::EngineError;
use crate::range::Range;
use crate::store::CollectionData;
use std::collections::{BTreeMap, BTreeSet};

/// Blocks, decoration sets, selection and the pending input range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    blocks: Vec<String>,
    annotations: DecorationSet<Annotation>,
    hints: DecorationSet<Hint>,
    slots: DecorationSet<Slot>,
    selection: BTreeSet<DecorationId>,
    pending_range: Option<Range>,
}

impl EditorState {
    pub fn new(blocks: Vec<String>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    /// Build state for an opened collection.
    pub fn from_collection(blocks: Vec<String>, data: CollectionData) -> Self {
        Self {
            blocks,
            annotations: data.annotations.into_iter().collect(),
            hints: data.hints.into_iter().collect(),
            slots: data.slots.into_iter().collect(),
            selection: BTreeSet::new(),
            pending_range: None,
        }
    }

    /// Persistable decoration sets.
    pub fn collection_data(&self) -> CollectionData {
        CollectionData {
            annotations: self.annotations.to_vec(),
            slots: self.slots.to_vec(),
            hints: self.hints.to_vec(),
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Text of one block.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidRange`] when `block_index` is out of range.
    pub fn block(&self, block_index: usize) -> Result<&str, EngineError> {
        self.blocks
            .get(block_index)
            .map(String::as_str)
            .ok_or_else(|| {
                EngineError::invalid_range(
                    Range::new(block_index, 0, 0),
                    format!("document has {} blocks", self.blocks.len()),
                )
            })
    }

    pub fn annotations(&self) -> &DecorationSet<Annotation> {
        &self.annotations
    }

    pub fn hints(&self) -> &DecorationSet<Hint> {
        &self.hints
    }

    pub fn slots(&self) -> &DecorationSet<Slot> {
        &self.slots
    }

    pub fn selection(&self) -> &BTreeSet<DecorationId> {
        &self.selection
    }

    pub fn pending_range(&self) -> Option<Range> {
        self.pending_range
    }

    /// Union of every live decoration set, keyed by id.
    ///
    /// Ids carry their kind, so the three sets never share a key.
    pub fn gather(&self) -> BTreeMap<DecorationId, Decoration> {
        let mut gathered = BTreeMap::new();
        let all = self
            .annotations
            .iter()
            .cloned()
            .map(Decoration::from)
            .chain(self.hints.iter().cloned().map(Decoration::from))
            .chain(self.slots.iter().cloned().map(Decoration::from));
        for decoration in all {
            let previous = gathered.insert(decoration.id(), decoration);
            debug_assert!(previous.is_none(), "decoration id collision in gather");
        }
        gathered
    }

    /// Gathered decorations on one block, in id order.
    pub fn decorations_on_block(&self, block_index: usize) -> Vec<Decoration> {
        self.gather()
            .into_values()
            .filter(|d| d.range().block_index == block_index)
            .collect()
    }

    pub fn get_decoration(&self, id: &DecorationId) -> Option<Decoration> {
        match id.kind {
            DecorationKind::Annotation => self.annotations.get(id).cloned().map(Decoration::from),
            DecorationKind::Hint => self.hints.get(id).cloned().map(Decoration::from),
            DecorationKind::Slot => self.slots.get(id).cloned().map(Decoration::from),
        }
    }

    pub fn contains_decoration(&self, id: &DecorationId) -> bool {
        match id.kind {
            DecorationKind::Annotation => self.annotations.contains(id),
            DecorationKind::Hint => self.hints.contains(id),
            DecorationKind::Slot => self.slots.contains(id),
        }
    }

    /// Covered text of a decoration.
    ///
    /// # Errors
    /// Returns range errors when the decoration does not fit its block.
    pub fn text_of(&self, range: &Range) -> Result<String, EngineError> {
        range.substring(self.block(range.block_index)?)
    }

    pub fn insert_decoration(&mut self, decoration: Decoration) {
        match decoration {
            Decoration::Annotation(a) => {
                self.annotations.insert(a);
            }
            Decoration::Hint(h) => {
                self.hints.insert(h);
            }
            Decoration::Slot(s) => {
                self.slots.insert(s);
            }
        }
    }

    pub fn remove_decoration(&mut self, id: &DecorationId) -> Option<Decoration> {
        match id.kind {
            DecorationKind::Annotation => self.annotations.remove(id).map(Decoration::from),
            DecorationKind::Hint => self.hints.remove(id).map(Decoration::from),
            DecorationKind::Slot => self.slots.remove(id).map(Decoration::from),
        }
    }

    pub fn set_selection(&mut self, selection: BTreeSet<DecorationId>) {
        self.selection = selection;
    }

    pub fn set_pending_range(&mut self, range: Option<Range>) {
        self.pending_range = range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::IdGenerator;

    #[test]
    fn gather_unions_all_kinds_and_keeps_ids_distinct() {
        let ids = IdGenerator::new();
        let mut state = EditorState::new(vec!["hello world".to_string()]);
        let annotation = Annotation::annotate_range(
            ids.next(DecorationKind::Annotation),
            "X",
            Range::new(0, 0, 5),
        );
        let slot = Slot::new(ids.next(DecorationKind::Slot), Range::new(0, 0, 11), "sentence");
        state.insert_decoration(annotation.clone().into());
        state.insert_decoration(slot.clone().into());

        let gathered = state.gather();
        assert_eq!(gathered.len(), 2);
        assert_eq!(annotation.id.seq, slot.id.seq, "same seq, different kinds");
        assert_eq!(gathered.get(&slot.id), Some(&Decoration::Slot(slot)));
    }

    #[test]
    fn collection_data_roundtrips_through_state() {
        let ids = IdGenerator::new();
        let mut state = EditorState::new(vec!["abc".to_string()]);
        state.insert_decoration(
            Annotation::annotate_range(ids.next(DecorationKind::Annotation), "T", Range::new(0, 0, 2))
                .into(),
        );
        let rebuilt = EditorState::from_collection(state.blocks().to_vec(), state.collection_data());
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn block_lookup_reports_invalid_index() {
        let state = EditorState::new(vec!["only".to_string()]);
        assert_eq!(state.block(0).expect("block 0"), "only");
        assert!(matches!(
            state.block(3),
            Err(EngineError::InvalidRange { .. })
        ));
    }
}
