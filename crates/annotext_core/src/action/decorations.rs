use super::{impl_action_plumbing, ActionMeta, Preparation, ReversibleAction};
use crate::decoration::{Annotation, Decorated, Decoration, DecorationId, Hint};
use crate::error::EngineError;
use crate::history::History;
use crate::range::Range;
use crate::state::EditorState;
use std::collections::{BTreeSet, HashSet};

fn check_insertable<'a>(
    state: &EditorState,
    decorations: impl IntoIterator<Item = &'a Decoration>,
) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for decoration in decorations {
        let id = decoration.id();
        if !seen.insert(id) || state.contains_decoration(&id) {
            return Err(EngineError::DuplicateDecoration(id));
        }
        decoration.range().validate(state.blocks())?;
    }
    Ok(())
}

fn deselect(state: &mut EditorState, removed: &[Decoration]) {
    let ids: HashSet<DecorationId> = removed.iter().map(Decorated::id).collect();
    let selection: BTreeSet<DecorationId> = state
        .selection()
        .iter()
        .copied()
        .filter(|id| !ids.contains(id))
        .collect();
    state.set_selection(selection);
}

/// Add any mix of annotations, hints and slots.
///
/// Guards set with [`AddDecorations::exclusive_slot_type`] and
/// [`AddDecorations::skip_overlapping`] are checked against the state the
/// action is applied to, not the state it was built from.
#[derive(Debug, Clone)]
pub struct AddDecorations {
    meta: ActionMeta,
    decorations: Vec<Decoration>,
    message: Option<String>,
    exclusive_slot_type: Option<String>,
    skip_overlapping: bool,
}

impl AddDecorations {
    pub fn new(decorations: impl IntoIterator<Item = Decoration>) -> Self {
        Self {
            meta: ActionMeta::default(),
            decorations: decorations.into_iter().collect(),
            message: None,
            exclusive_slot_type: None,
            skip_overlapping: false,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Fail with [`EngineError::Conflict`] if a slot of `slot_type` exists.
    #[must_use]
    pub fn exclusive_slot_type(mut self, slot_type: impl Into<String>) -> Self {
        self.exclusive_slot_type = Some(slot_type.into());
        self
    }

    /// Drop decorations overlapping an existing one. Fails with
    /// [`EngineError::Conflict`] if none are left.
    #[must_use]
    pub fn skip_overlapping(mut self) -> Self {
        self.skip_overlapping = true;
        self
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }
}

impl ReversibleAction for AddDecorations {
    impl_action_plumbing!();

    fn message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match self.decorations.as_slice() {
            [Decoration::Annotation(a)] => format!("Annotate {} as {}", a.range, a.tag),
            decorations => format!("Add {} decoration(s)", decorations.len()),
        }
    }

    fn prepare(
        &mut self,
        state: &EditorState,
        _history: &History,
    ) -> Result<Preparation, EngineError> {
        if let Some(slot_type) = &self.exclusive_slot_type {
            if state.slots().iter().any(|slot| slot.slot_type == *slot_type) {
                return Err(EngineError::Conflict(format!(
                    "{} slots already exist",
                    slot_type
                )));
            }
        }
        if self.skip_overlapping {
            let existing: Vec<Range> = state.gather().values().map(Decorated::range).collect();
            self.decorations
                .retain(|decoration| !existing.iter().any(|r| r.overlaps(&decoration.range())));
            if self.decorations.is_empty() {
                return Err(EngineError::Conflict(
                    "every decoration overlaps an existing one".to_string(),
                ));
            }
        }
        check_insertable(state, &self.decorations)?;
        Ok(Preparation::Fresh)
    }

    fn next(&self, state: &mut EditorState) {
        for decoration in &self.decorations {
            state.insert_decoration(decoration.clone());
        }
    }

    fn prev(&self, state: &mut EditorState) {
        for decoration in &self.decorations {
            state.remove_decoration(&decoration.id());
        }
    }
}

/// Remove decorations by id, dropping them from the selection too.
#[derive(Debug, Clone)]
pub struct RemoveDecorations {
    meta: ActionMeta,
    ids: Vec<DecorationId>,
    removed: Vec<Decoration>,
    prev_sel: BTreeSet<DecorationId>,
}

impl RemoveDecorations {
    pub fn new(ids: impl IntoIterator<Item = DecorationId>) -> Self {
        let mut seen = HashSet::new();
        Self {
            meta: ActionMeta::default(),
            ids: ids.into_iter().filter(|id| seen.insert(*id)).collect(),
            removed: Vec::new(),
            prev_sel: BTreeSet::new(),
        }
    }

    pub fn ids(&self) -> &[DecorationId] {
        &self.ids
    }
}

impl ReversibleAction for RemoveDecorations {
    impl_action_plumbing!();

    fn message(&self) -> String {
        format!("Remove {} decoration(s)", self.ids.len())
    }

    fn prepare(
        &mut self,
        state: &EditorState,
        _history: &History,
    ) -> Result<Preparation, EngineError> {
        self.removed = self
            .ids
            .iter()
            .map(|id| {
                state
                    .get_decoration(id)
                    .ok_or(EngineError::DanglingReference(*id))
            })
            .collect::<Result<_, _>>()?;
        self.prev_sel = state.selection().clone();
        Ok(Preparation::Fresh)
    }

    fn next(&self, state: &mut EditorState) {
        for id in &self.ids {
            state.remove_decoration(id);
        }
        deselect(state, &self.removed);
    }

    fn prev(&self, state: &mut EditorState) {
        for decoration in &self.removed {
            state.insert_decoration(decoration.clone());
        }
        state.set_selection(self.prev_sel.clone());
    }
}

/// Replace a hint by the annotations it proposes.
#[derive(Debug, Clone)]
pub struct AcceptHint {
    meta: ActionMeta,
    hint_id: DecorationId,
    hint: Option<Hint>,
    prev_sel: BTreeSet<DecorationId>,
}

impl AcceptHint {
    pub fn new(hint_id: DecorationId) -> Self {
        Self {
            meta: ActionMeta::default(),
            hint_id,
            hint: None,
            prev_sel: BTreeSet::new(),
        }
    }

    pub fn hint_id(&self) -> DecorationId {
        self.hint_id
    }

    fn accepted(&self) -> &[Annotation] {
        self.hint
            .as_ref()
            .map(|hint| hint.accept.annotations())
            .unwrap_or_default()
    }
}

impl ReversibleAction for AcceptHint {
    impl_action_plumbing!();

    fn message(&self) -> String {
        match &self.hint {
            Some(hint) => format!("Accept hint '{}'", hint.hint),
            None => format!("Accept {}", self.hint_id),
        }
    }

    fn prepare(
        &mut self,
        state: &EditorState,
        _history: &History,
    ) -> Result<Preparation, EngineError> {
        let hint = state
            .hints()
            .get(&self.hint_id)
            .cloned()
            .ok_or(EngineError::DanglingReference(self.hint_id))?;
        let payload: Vec<Decoration> = hint
            .accept
            .annotations()
            .iter()
            .cloned()
            .map(Decoration::from)
            .collect();
        check_insertable(state, &payload)?;
        self.hint = Some(hint);
        self.prev_sel = state.selection().clone();
        Ok(Preparation::Fresh)
    }

    fn next(&self, state: &mut EditorState) {
        let Some(hint) = &self.hint else {
            return;
        };
        state.remove_decoration(&hint.id);
        deselect(state, &[Decoration::Hint(hint.clone())]);
        for annotation in self.accepted() {
            state.insert_decoration(annotation.clone().into());
        }
    }

    fn prev(&self, state: &mut EditorState) {
        let Some(hint) = &self.hint else {
            return;
        };
        for annotation in self.accepted() {
            state.remove_decoration(&annotation.id);
        }
        state.insert_decoration(hint.clone().into());
        state.set_selection(self.prev_sel.clone());
    }
}

/// Remove every decoration on one block.
#[derive(Debug, Clone)]
pub struct ClearBlockDecorations {
    meta: ActionMeta,
    block_index: usize,
    removed: Vec<Decoration>,
    prev_sel: BTreeSet<DecorationId>,
}

impl ClearBlockDecorations {
    pub fn new(block_index: usize) -> Self {
        Self {
            meta: ActionMeta::default(),
            block_index,
            removed: Vec::new(),
            prev_sel: BTreeSet::new(),
        }
    }
}

impl ReversibleAction for ClearBlockDecorations {
    impl_action_plumbing!();

    fn message(&self) -> String {
        format!(
            "Clear {} decoration(s) on block {}",
            self.removed.len(),
            self.block_index
        )
    }

    fn prepare(
        &mut self,
        state: &EditorState,
        _history: &History,
    ) -> Result<Preparation, EngineError> {
        state.block(self.block_index)?;
        self.removed = state.decorations_on_block(self.block_index);
        self.prev_sel = state.selection().clone();
        Ok(Preparation::Fresh)
    }

    fn next(&self, state: &mut EditorState) {
        for decoration in &self.removed {
            state.remove_decoration(&decoration.id());
        }
        deselect(state, &self.removed);
    }

    fn prev(&self, state: &mut EditorState) {
        for decoration in &self.removed {
            state.insert_decoration(decoration.clone());
        }
        state.set_selection(self.prev_sel.clone());
    }
}
