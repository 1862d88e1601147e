use super::{impl_action_plumbing, ActionCategory, ActionMeta, Preparation, ReversibleAction};
use crate::error::EngineError;
use crate::history::History;
use crate::state::EditorState;

/// Revert boundary recorded after a collection is persisted.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    meta: ActionMeta,
    label: String,
}

impl Checkpoint {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            meta: ActionMeta {
                id: None,
                category: ActionCategory::SideEffects,
            },
            label: label.into(),
        }
    }
}

impl ReversibleAction for Checkpoint {
    impl_action_plumbing!();

    fn message(&self) -> String {
        self.label.clone()
    }

    fn prepare(
        &mut self,
        _state: &EditorState,
        _history: &History,
    ) -> Result<Preparation, EngineError> {
        Ok(Preparation::Fresh)
    }

    fn next(&self, _state: &mut EditorState) {}

    fn prev(&self, _state: &mut EditorState) {}
}
