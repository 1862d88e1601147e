//! An open collection: editor state, its history, and the last saved snapshot.

use crate::action::{ActionId, ActionSummary, Checkpoint, Preparation, ReversibleAction};
use crate::decoration::{Decorated, IdGenerator};
use crate::error::EngineError;
use crate::history::History;
use crate::range::Range;
use crate::state::EditorState;
use crate::store::{CollectionData, CollectionStore};
use tracing::{debug, info};

const ACTION_LOG_TARGET: &str = "annotext_core::actions";

fn log_action(enabled: bool, op: &str, summary: &ActionSummary, count: usize) {
    if enabled {
        info!(
            target: ACTION_LOG_TARGET,
            op = op,
            action = %summary,
            history_count = count,
            "history step"
        );
    } else {
        debug!(op = op, action = %summary, history_count = count, "history step");
    }
}

/// Single-writer owner of [`EditorState`] and [`History`].
///
/// All mutations go through [`Session::apply`], [`Session::undo`],
/// [`Session::redo`] and [`Session::revert_to_last_checkpoint`].
#[derive(Debug)]
pub struct Session {
    doc_id: String,
    coll_id: String,
    state: EditorState,
    history: History,
    ids: IdGenerator,
    saved: CollectionData,
    next_action_seq: u64,
    log_actions: bool,
}

impl Session {
    /// Open a collection over `blocks`.
    ///
    /// Resets `ids` and seeds it past every id in `data`, including the
    /// annotations proposed by stored hints.
    pub fn open(
        doc_id: impl Into<String>,
        coll_id: impl Into<String>,
        blocks: Vec<String>,
        data: CollectionData,
        ids: IdGenerator,
        history_limit: usize,
    ) -> Self {
        ids.reset();
        for annotation in &data.annotations {
            ids.observe(annotation.id);
        }
        for slot in &data.slots {
            ids.observe(slot.id);
        }
        for hint in &data.hints {
            ids.observe(hint.id);
            for proposed in hint.accept.annotations() {
                ids.observe(proposed.id());
            }
        }

        Self {
            doc_id: doc_id.into(),
            coll_id: coll_id.into(),
            state: EditorState::from_collection(blocks, data.clone()),
            history: History::with_limit(history_limit),
            ids,
            saved: data,
            next_action_seq: 1,
            log_actions: false,
        }
    }

    #[must_use]
    pub fn with_action_logging(mut self, enabled: bool) -> Self {
        self.log_actions = enabled;
        self
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn coll_id(&self) -> &str {
        &self.coll_id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Update the transient input range. Not recorded in history.
    pub fn set_pending_range(&mut self, range: Option<Range>) {
        self.state.set_pending_range(range);
    }

    /// Decorations differ from the last saved or loaded snapshot.
    pub fn is_dirty(&self) -> bool {
        self.state.collection_data() != self.saved
    }

    /// Prepare, apply and record `action`.
    ///
    /// # Errors
    /// Returns the error from `prepare`; state and history are unchanged.
    pub fn apply(
        &mut self,
        mut action: Box<dyn ReversibleAction>,
    ) -> Result<ActionSummary, EngineError> {
        let preparation = action.prepare(&self.state, &self.history)?;
        action.next(&mut self.state);

        action.meta_mut().id = Some(ActionId(self.next_action_seq));
        self.next_action_seq += 1;
        let summary = action.summary();

        match preparation {
            Preparation::Fresh => self.history.push(action),
            Preparation::CoalesceWithLast => self.history.replace_last(action),
        }
        log_action(
            self.log_actions,
            match preparation {
                Preparation::Fresh => "apply",
                Preparation::CoalesceWithLast => "apply-coalesced",
            },
            &summary,
            self.history.count(),
        );
        Ok(summary)
    }

    /// Undo the last applied action. `None` when nothing is applied.
    pub fn undo(&mut self) -> Option<ActionSummary> {
        let action = self.history.step_back()?;
        action.prev(&mut self.state);
        let summary = action.summary();
        log_action(self.log_actions, "undo", &summary, self.history.count());
        Some(summary)
    }

    /// Reapply the next action of the redo tail. `None` at the end of history.
    pub fn redo(&mut self) -> Option<ActionSummary> {
        let action = self.history.step_forward()?;
        action.next(&mut self.state);
        let summary = action.summary();
        log_action(self.log_actions, "redo", &summary, self.history.count());
        Some(summary)
    }

    /// Undo back to and including the most recent side-effect boundary.
    ///
    /// Returns the undone actions, newest first. Empty when nothing is applied.
    pub fn revert_to_last_checkpoint(&mut self) -> Vec<ActionSummary> {
        let mut undone = Vec::new();
        while let Some(summary) = self.undo() {
            let boundary = summary.category == crate::action::ActionCategory::SideEffects;
            undone.push(summary);
            if boundary {
                break;
            }
        }
        undone
    }

    /// Persist the decorations, then record a checkpoint.
    ///
    /// # Errors
    /// Returns the store error; state and history are unchanged.
    pub fn save(&mut self, store: &dyn CollectionStore) -> Result<ActionSummary, EngineError> {
        let data = self.state.collection_data();
        store.save_collection(&self.doc_id, &self.coll_id, &data)?;
        info!(
            doc_id = %self.doc_id,
            coll_id = %self.coll_id,
            annotations = data.annotations.len(),
            hints = data.hints.len(),
            slots = data.slots.len(),
            "saved collection"
        );
        self.saved = data;
        self.apply(Box::new(Checkpoint::new(format!(
            "Save {}/{}",
            self.doc_id, self.coll_id
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{AddDecorations, SetSel, SetSelMethod};
    use crate::decoration::{Annotation, DecorationKind};
    use crate::store::MemoryStore;

    fn session() -> Session {
        Session::open(
            "doc",
            "coll",
            vec!["hello world".to_string(), "second block".to_string()],
            CollectionData::default(),
            IdGenerator::new(),
            100,
        )
    }

    fn annotate(session: &Session, tag: &str, range: Range) -> Box<dyn ReversibleAction> {
        let id = session.ids().next(DecorationKind::Annotation);
        Box::new(AddDecorations::new([Annotation::annotate_range(id, tag, range).into()]))
    }

    #[test]
    fn apply_undo_redo_moves_cursor() {
        let mut session = session();
        let action = annotate(&session, "X", Range::new(0, 0, 5));
        session.apply(action).expect("apply");
        assert_eq!(session.state().annotations().len(), 1);

        assert!(session.undo().is_some());
        assert!(session.state().annotations().is_empty());
        assert!(session.undo().is_none(), "undo at empty history is a no-op");

        assert!(session.redo().is_some());
        assert_eq!(session.state().annotations().len(), 1);
        assert!(session.redo().is_none(), "redo at end is a no-op");
    }

    #[test]
    fn failed_prepare_leaves_state_and_history_untouched() {
        let mut session = session();
        let before = session.state().clone();
        let action = annotate(&session, "X", Range::new(0, 3, 40));
        let err = session.apply(action).expect_err("out of bounds");
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
        assert_eq!(session.state(), &before);
        assert!(session.history().is_empty());
    }

    #[test]
    fn consecutive_select_coalesces_into_one_entry() {
        let mut session = session();
        let a = session.ids().next(DecorationKind::Annotation);
        let b = session.ids().next(DecorationKind::Annotation);
        session
            .apply(Box::new(AddDecorations::new([
                Annotation::annotate_range(a, "X", Range::new(0, 0, 5)).into(),
                Annotation::annotate_range(b, "Y", Range::new(1, 0, 6)).into(),
            ])))
            .expect("add");

        session
            .apply(Box::new(SetSel::new([a], SetSelMethod::Select)))
            .expect("select a");
        session
            .apply(Box::new(SetSel::new([b], SetSelMethod::Select)))
            .expect("select b");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.state().selection().iter().copied().collect::<Vec<_>>(), vec![b]);

        session.undo().expect("undo coalesced select");
        assert!(session.state().selection().is_empty());
        assert_eq!(session.history().count(), 1);
    }

    #[test]
    fn revert_stops_after_one_checkpoint() {
        let store = MemoryStore::with_document("doc", Vec::new());
        let mut session = session();
        for start in [0, 6] {
            let action = annotate(&session, "E", Range::new(0, start, start + 2));
            session.apply(action).expect("edit");
        }
        session.save(&store).expect("save");
        let action = annotate(&session, "E", Range::new(1, 0, 6));
        session.apply(action).expect("edit");

        let undone = session.revert_to_last_checkpoint();
        assert_eq!(undone.len(), 2);
        assert_eq!(session.history().count(), 2);
        assert_eq!(session.state().annotations().len(), 2);

        let undone = session.revert_to_last_checkpoint();
        assert_eq!(undone.len(), 2, "no earlier checkpoint, walks to the start");
        assert_eq!(session.history().count(), 0);
        assert!(session.revert_to_last_checkpoint().is_empty());
    }

    #[test]
    fn save_clears_dirty_flag() {
        let store = MemoryStore::with_document("doc", Vec::new());
        let mut session = session();
        assert!(!session.is_dirty());
        let action = annotate(&session, "X", Range::new(0, 0, 5));
        session.apply(action).expect("apply");
        assert!(session.is_dirty());

        session.save(&store).expect("save");
        assert!(!session.is_dirty());
        let stored = store
            .load_collection("doc", "coll")
            .expect("load")
            .expect("saved collection");
        assert_eq!(stored, session.state().collection_data());
    }

    #[test]
    fn open_seeds_ids_past_stored_ones() {
        let ids = IdGenerator::new();
        let stored = Annotation::annotate_range(
            crate::decoration::DecorationId::new(DecorationKind::Annotation, 41),
            "T",
            Range::new(0, 0, 1),
        );
        let data = CollectionData {
            annotations: vec![stored],
            ..CollectionData::default()
        };
        let session = Session::open("d", "c", vec!["x".to_string()], data, ids.clone(), 10);
        assert!(!session.is_dirty());
        assert_eq!(ids.next(DecorationKind::Annotation).seq, 42);
        assert_eq!(ids.next(DecorationKind::Slot).seq, 1);
    }
}
