use super::{impl_action_plumbing, ActionMeta, Preparation, ReversibleAction};
use crate::decoration::DecorationId;
use crate::error::EngineError;
use crate::history::History;
use crate::state::EditorState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a selection change was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetSelMethod {
    Select,
    Toggle,
    Intersection,
    AutoClear,
    ManualClear,
}

impl SetSelMethod {
    /// Whether a change made with `self` folds into a preceding change made
    /// with `last`.
    pub fn coalesces_after(self, last: SetSelMethod) -> bool {
        (self == last || last == Self::AutoClear)
            && matches!(self, Self::Toggle | Self::Select | Self::Intersection)
    }
}

/// Replace the selection.
#[derive(Debug, Clone)]
pub struct SetSel {
    meta: ActionMeta,
    next_sel: BTreeSet<DecorationId>,
    method: SetSelMethod,
    prev_sel: BTreeSet<DecorationId>,
}

impl SetSel {
    pub fn new(next_sel: impl IntoIterator<Item = DecorationId>, method: SetSelMethod) -> Self {
        Self {
            meta: ActionMeta::default(),
            next_sel: next_sel.into_iter().collect(),
            method,
            prev_sel: BTreeSet::new(),
        }
    }

    pub fn clear(method: SetSelMethod) -> Self {
        Self::new(std::iter::empty(), method)
    }

    pub fn method(&self) -> SetSelMethod {
        self.method
    }

    pub fn next_sel(&self) -> &BTreeSet<DecorationId> {
        &self.next_sel
    }
}

impl ReversibleAction for SetSel {
    impl_action_plumbing!();

    fn message(&self) -> String {
        if self.next_sel.is_empty() {
            "Clear selection".to_string()
        } else {
            format!("Select {} decoration(s)", self.next_sel.len())
        }
    }

    fn prepare(
        &mut self,
        state: &EditorState,
        history: &History,
    ) -> Result<Preparation, EngineError> {
        if let Some(missing) = self
            .next_sel
            .iter()
            .find(|id| !state.contains_decoration(id))
        {
            return Err(EngineError::DanglingReference(*missing));
        }

        let last = history
            .last_applied()
            .and_then(|action| action.as_any().downcast_ref::<SetSel>());
        if let Some(last) = last {
            if self.method.coalesces_after(last.method) {
                self.prev_sel = last.prev_sel.clone();
                return Ok(Preparation::CoalesceWithLast);
            }
        }

        self.prev_sel = state.selection().clone();
        Ok(Preparation::Fresh)
    }

    fn next(&self, state: &mut EditorState) {
        state.set_selection(self.next_sel.clone());
    }

    fn prev(&self, state: &mut EditorState) {
        state.set_selection(self.prev_sel.clone());
    }
}
