//! Editing commands: apply a user action, then broadcast the interaction.

use crate::engine::Engine;
use crate::error::TaskError;
use crate::interaction::Interaction;
use annotext_core::{
    AcceptHint, ActionSummary, AddDecorations, Annotation, ClearBlockDecorations, DecorationId,
    DecorationKind, Range, RemoveDecorations, SetSel, SetSelMethod,
};
use std::collections::BTreeSet;

/// User-facing command surface over an [`Engine`].
#[derive(Debug, Clone)]
pub struct Editor {
    engine: Engine,
}

impl Editor {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Set the pending text range. A new range auto-clears the decoration
    /// selection.
    ///
    /// # Errors
    /// Returns a range error when `range` does not fit the document.
    pub async fn select_text(&self, range: Option<Range>) -> Result<(), TaskError> {
        self.engine.set_pending_range(range).await?;
        if range.is_some() && !self.engine.snapshot().await?.selection().is_empty() {
            self.engine
                .apply(Box::new(SetSel::clear(SetSelMethod::AutoClear)))
                .await?;
        }
        Ok(())
    }

    /// Annotate the pending range with `tag`. `None` when no range is pending.
    ///
    /// # Errors
    /// Returns the engine error when the annotation cannot be applied.
    pub async fn annotate(&self, tag: &str) -> Result<Option<ActionSummary>, TaskError> {
        let Some(range) = self.engine.snapshot().await?.pending_range() else {
            return Ok(None);
        };
        self.annotate_range(range, tag).await.map(Some)
    }

    /// Annotate `range` with `tag` and broadcast the annotation.
    ///
    /// # Errors
    /// Returns the engine error when the annotation cannot be applied.
    pub async fn annotate_range(&self, range: Range, tag: &str) -> Result<ActionSummary, TaskError> {
        let range = range.normalize();
        let annotation =
            Annotation::annotate_range(self.engine.ids().next(DecorationKind::Annotation), tag, range);
        let summary = self
            .engine
            .apply(Box::new(AddDecorations::new([annotation.into()])))
            .await?;
        self.engine.set_pending_range(None).await?;
        self.engine.publish(Interaction::UserAnnotateText {
            range,
            tag: tag.to_string(),
        });
        Ok(summary)
    }

    /// Select `id`, or toggle it when `ctrl` is held.
    ///
    /// # Errors
    /// Returns [`annotext_core::EngineError::DanglingReference`] for an unknown id.
    pub async fn click_decoration(
        &self,
        id: DecorationId,
        ctrl: bool,
    ) -> Result<ActionSummary, TaskError> {
        let action = if ctrl {
            let mut selection = self.engine.snapshot().await?.selection().clone();
            if !selection.remove(&id) {
                selection.insert(id);
            }
            SetSel::new(selection, SetSelMethod::Toggle)
        } else {
            SetSel::new([id], SetSelMethod::Select)
        };
        let summary = self.engine.apply(Box::new(action)).await?;
        self.engine
            .publish(Interaction::UserClickDecoration { id, ctrl });
        Ok(summary)
    }

    /// Replace the selection with `ids` using `method`.
    ///
    /// # Errors
    /// Returns [`annotext_core::EngineError::DanglingReference`] for an unknown id.
    pub async fn change_selection(
        &self,
        ids: impl IntoIterator<Item = DecorationId>,
        method: SetSelMethod,
    ) -> Result<ActionSummary, TaskError> {
        let ids: BTreeSet<DecorationId> = ids.into_iter().collect();
        let summary = self
            .engine
            .apply(Box::new(SetSel::new(ids.iter().copied(), method)))
            .await?;
        self.engine.publish(Interaction::UserChangeSelection {
            ids: ids.into_iter().collect(),
        });
        Ok(summary)
    }

    /// # Errors
    /// Returns [`annotext_core::EngineError::NoSession`] when nothing is open.
    pub async fn clear_selection(&self) -> Result<ActionSummary, TaskError> {
        self.change_selection(std::iter::empty(), SetSelMethod::ManualClear)
            .await
    }

    /// Remove every selected decoration. `None` when nothing is selected.
    ///
    /// # Errors
    /// Returns the engine error when the removal cannot be applied.
    pub async fn clear_selected(&self) -> Result<Option<ActionSummary>, TaskError> {
        let selection = self.engine.snapshot().await?.selection().clone();
        if selection.is_empty() {
            return Ok(None);
        }
        let summary = self
            .engine
            .apply(Box::new(RemoveDecorations::new(selection.iter().copied())))
            .await?;
        self.engine.publish(Interaction::UserClearAnnotation {
            ids: selection.into_iter().collect(),
        });
        Ok(Some(summary))
    }

    /// # Errors
    /// Returns [`annotext_core::EngineError::DanglingReference`] when the hint is gone.
    pub async fn accept_hint(&self, hint_id: DecorationId) -> Result<ActionSummary, TaskError> {
        let summary = self
            .engine
            .apply(Box::new(AcceptHint::new(hint_id)))
            .await?;
        self.engine.publish(Interaction::UserAcceptHint { hint_id });
        Ok(summary)
    }

    /// # Errors
    /// Returns a range error for an unknown block.
    pub async fn clear_block(&self, block_index: usize) -> Result<ActionSummary, TaskError> {
        Ok(self
            .engine
            .apply(Box::new(ClearBlockDecorations::new(block_index)))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotext_core::{EngineConfig, EngineError, MemoryStore};
    use std::sync::Arc;

    async fn editor() -> Editor {
        let store = MemoryStore::with_document("doc", vec!["cat and cat".to_string()]);
        let engine = Engine::new(Arc::new(store), EngineConfig::default());
        engine.open("doc", "main").await.expect("open");
        Editor::new(engine)
    }

    #[tokio::test]
    async fn annotate_pending_range_publishes_interaction() {
        let editor = editor().await;
        let mut rx = editor.engine().bus().subscribe();
        assert!(editor.annotate("Animal").await.expect("no range").is_none());

        editor
            .select_text(Some(Range::new(0, 3, 0)))
            .await
            .expect("select");
        editor.annotate("Animal").await.expect("annotate").expect("applied");

        let state = editor.engine().snapshot().await.expect("snapshot");
        assert_eq!(state.pending_range(), None);
        let annotation = state.annotations().iter().next().expect("annotation");
        assert_eq!(annotation.range, Range::new(0, 0, 3));
        assert_eq!(
            rx.recv().await.expect("interaction"),
            Interaction::UserAnnotateText {
                range: Range::new(0, 0, 3),
                tag: "Animal".to_string()
            }
        );
    }

    #[tokio::test]
    async fn ctrl_click_toggles_and_clear_selected_removes() {
        let editor = editor().await;
        let first = editor
            .annotate_range(Range::new(0, 0, 3), "A")
            .await
            .expect("first");
        let second = editor
            .annotate_range(Range::new(0, 8, 11), "A")
            .await
            .expect("second");
        assert_ne!(first.id, second.id);

        let ids: Vec<DecorationId> = editor
            .engine()
            .snapshot()
            .await
            .expect("snapshot")
            .annotations()
            .ids()
            .collect();
        editor.click_decoration(ids[0], false).await.expect("click");
        editor.click_decoration(ids[1], true).await.expect("ctrl click");
        let state = editor.engine().snapshot().await.expect("snapshot");
        assert_eq!(state.selection().len(), 2);

        editor.clear_selected().await.expect("clear").expect("removed");
        let state = editor.engine().snapshot().await.expect("snapshot");
        assert!(state.annotations().is_empty());
        assert!(state.selection().is_empty());
        assert!(editor.clear_selected().await.expect("noop").is_none());
    }

    #[tokio::test]
    async fn selecting_text_auto_clears_and_select_coalesces_after_it() {
        let editor = editor().await;
        editor
            .annotate_range(Range::new(0, 0, 3), "A")
            .await
            .expect("annotate");
        let id = editor
            .engine()
            .snapshot()
            .await
            .expect("snapshot")
            .annotations()
            .ids()
            .next()
            .expect("id");
        editor.click_decoration(id, false).await.expect("select");
        editor
            .select_text(Some(Range::new(0, 4, 7)))
            .await
            .expect("select text");
        assert!(editor
            .engine()
            .snapshot()
            .await
            .expect("snapshot")
            .selection()
            .is_empty());
        let count = editor.engine().history_count().await.expect("count");
        editor.click_decoration(id, false).await.expect("reselect");
        assert_eq!(editor.engine().history_count().await.expect("count"), count);
    }

    #[tokio::test]
    async fn accepting_a_missing_hint_is_a_dangling_reference() {
        let editor = editor().await;
        let ghost = DecorationId::new(DecorationKind::Hint, 99);
        let err = editor.accept_hint(ghost).await.expect_err("dangling");
        assert!(matches!(
            err,
            TaskError::Engine(EngineError::DanglingReference(id)) if id == ghost
        ));
    }
}
