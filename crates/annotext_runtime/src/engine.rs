//! Shared handle over the open session.
//!
//! The session sits behind one async mutex. Every history step runs to
//! completion while the guard is held, so readers and task workers never
//! observe a partially applied action. tokio's mutex is fair, so waiting
//! writers are served in arrival order.

use crate::interaction::{Interaction, InteractionBus};
use crate::notification::Notification;
use annotext_core::{
    layout, ActionSummary, CollectionStore, Decoration, DecorationId, DocStats, EditorState,
    EngineConfig, EngineError, IdGenerator, Range, ReversibleAction, Session, SpanTree,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Shared {
    session: Mutex<Option<Session>>,
    store: Arc<dyn CollectionStore>,
    config: EngineConfig,
    ids: IdGenerator,
    bus: InteractionBus,
    notifications: broadcast::Sender<Notification>,
}

/// Cloneable engine handle shared by commands and task workers.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(store: Arc<dyn CollectionStore>, config: EngineConfig) -> Self {
        let bus = InteractionBus::new(config.interaction_capacity);
        let (notifications, _) = broadcast::channel(config.interaction_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(None),
                store,
                config,
                ids: IdGenerator::new(),
                bus,
                notifications,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.shared.store
    }

    /// Id source for decorations of the open collection.
    pub fn ids(&self) -> &IdGenerator {
        &self.shared.ids
    }

    pub fn bus(&self) -> &InteractionBus {
        &self.shared.bus
    }

    pub fn publish(&self, interaction: Interaction) -> usize {
        self.shared.bus.publish(interaction)
    }

    pub fn notify(&self, notification: Notification) {
        debug!(%notification, "notify");
        let _ = self.shared.notifications.send(notification);
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.shared.notifications.subscribe()
    }

    /// Open `coll_id` of `doc_id`, replacing any open session.
    ///
    /// A collection that was never saved opens empty.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] for an unknown document, or the
    /// store's error.
    pub async fn open(&self, doc_id: &str, coll_id: &str) -> Result<(), EngineError> {
        let store = &self.shared.store;
        let blocks = store
            .load_document(doc_id)?
            .ok_or_else(|| EngineError::NotFound(format!("document '{}'", doc_id)))?;
        let data = store.load_collection(doc_id, coll_id)?.unwrap_or_default();

        let mut guard = self.shared.session.lock().await;
        let session = Session::open(
            doc_id,
            coll_id,
            blocks,
            data,
            self.shared.ids.clone(),
            self.shared.config.history_limit,
        )
        .with_action_logging(self.shared.config.log_actions);
        info!(
            doc_id,
            coll_id,
            blocks = session.state().blocks().len(),
            decorations = session.state().gather().len(),
            "opened collection"
        );
        *guard = Some(session);
        Ok(())
    }

    /// Close the open session. Returns `false` when none was open.
    pub async fn close(&self) -> bool {
        self.shared.session.lock().await.take().is_some()
    }

    pub async fn is_open(&self) -> bool {
        self.shared.session.lock().await.is_some()
    }

    /// Hold the session lock, stalling every engine call until dropped.
    #[cfg(test)]
    pub(crate) async fn lock_session(&self) -> tokio::sync::MutexGuard<'_, Option<Session>> {
        self.shared.session.lock().await
    }

    async fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = self.shared.session.lock().await;
        let session = guard.as_mut().ok_or(EngineError::NoSession)?;
        f(session)
    }

    /// Apply `action` to the open session.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`] or the action's prepare error.
    pub async fn apply(
        &self,
        action: Box<dyn ReversibleAction>,
    ) -> Result<ActionSummary, EngineError> {
        self.with_session(|session| session.apply(action)).await
    }

    /// Apply `action` unless `cancel` fires before the session lock is held.
    ///
    /// Returns `Ok(None)` when cancelled. Once the lock is held and the token
    /// is still live the apply runs to completion.
    ///
    /// # Errors
    /// Same as [`Engine::apply`].
    pub async fn apply_unless_cancelled(
        &self,
        action: Box<dyn ReversibleAction>,
        cancel: &CancellationToken,
    ) -> Result<Option<ActionSummary>, EngineError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let mut guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            guard = self.shared.session.lock() => guard,
        };
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let session = guard.as_mut().ok_or(EngineError::NoSession)?;
        session.apply(action).map(Some)
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn undo(&self) -> Result<Option<ActionSummary>, EngineError> {
        self.with_session(|session| Ok(session.undo())).await
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn redo(&self) -> Result<Option<ActionSummary>, EngineError> {
        self.with_session(|session| Ok(session.redo())).await
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn revert_to_last_checkpoint(&self) -> Result<Vec<ActionSummary>, EngineError> {
        self.with_session(|session| Ok(session.revert_to_last_checkpoint()))
            .await
    }

    /// Persist the open collection and record a checkpoint.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`] or the store error; on a store error
    /// state and history are unchanged.
    pub async fn save(&self) -> Result<ActionSummary, EngineError> {
        let store = Arc::clone(&self.shared.store);
        self.with_session(|session| session.save(store.as_ref()))
            .await
    }

    /// Clone of the current editor state.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn snapshot(&self) -> Result<EditorState, EngineError> {
        self.with_session(|session| Ok(session.state().clone()))
            .await
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn gather(&self) -> Result<BTreeMap<DecorationId, Decoration>, EngineError> {
        self.with_session(|session| Ok(session.state().gather()))
            .await
    }

    /// Layout of one block over a consistent snapshot.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`], or the range or layout error.
    pub async fn layout_block(&self, block_index: usize) -> Result<SpanTree, EngineError> {
        self.with_session(|session| {
            let state = session.state();
            let decorations = state.decorations_on_block(block_index);
            layout(state.block(block_index)?, block_index, &decorations)
        })
        .await
    }

    /// Update the pending input range without touching history.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`], or a range error when `range`
    /// does not fit the document.
    pub async fn set_pending_range(&self, range: Option<Range>) -> Result<(), EngineError> {
        self.with_session(|session| {
            if let Some(range) = &range {
                range.validate(session.state().blocks())?;
            }
            session.set_pending_range(range);
            Ok(())
        })
        .await
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn is_dirty(&self) -> Result<bool, EngineError> {
        self.with_session(|session| Ok(session.is_dirty())).await
    }

    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn stats(&self) -> Result<DocStats, EngineError> {
        self.with_session(|session| Ok(DocStats::compute(session.state())))
            .await
    }

    /// Applied history entries (the undo depth).
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn history_count(&self) -> Result<usize, EngineError> {
        self.with_session(|session| Ok(session.history().count()))
            .await
    }

    /// Summaries of every history entry, oldest first, and the cursor.
    ///
    /// # Errors
    /// Returns [`EngineError::NoSession`] when nothing is open.
    pub async fn history(&self) -> Result<(Vec<ActionSummary>, usize), EngineError> {
        self.with_session(|session| {
            let history = session.history();
            Ok((history.iter().map(|a| a.summary()).collect(), history.count()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotext_core::{AddDecorations, Annotation, DecorationKind, MemoryStore};

    fn engine() -> Engine {
        let store = MemoryStore::with_document("doc", vec!["hello world".to_string()]);
        Engine::new(Arc::new(store), EngineConfig::default())
    }

    fn annotation(engine: &Engine) -> Box<dyn ReversibleAction> {
        let id = engine.ids().next(DecorationKind::Annotation);
        Box::new(AddDecorations::new([
            Annotation::annotate_range(id, "X", Range::new(0, 0, 5)).into(),
        ]))
    }

    #[tokio::test]
    async fn operations_require_open_session() {
        let engine = engine();
        assert!(matches!(engine.undo().await, Err(EngineError::NoSession)));
        assert!(matches!(
            engine.open("missing", "c").await,
            Err(EngineError::NotFound(_))
        ));
        engine.open("doc", "c").await.expect("open");
        assert!(engine.is_open().await);
        assert_eq!(engine.undo().await.expect("undo"), None);
    }

    #[tokio::test]
    async fn cancelled_token_skips_apply() {
        let engine = engine();
        engine.open("doc", "c").await.expect("open");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let applied = engine
            .apply_unless_cancelled(annotation(&engine), &cancel)
            .await
            .expect("apply");
        assert!(applied.is_none());
        assert_eq!(engine.history_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn save_then_reopen_restores_decorations() {
        let engine = engine();
        engine.open("doc", "c").await.expect("open");
        engine.apply(annotation(&engine)).await.expect("apply");
        assert!(engine.is_dirty().await.expect("dirty"));
        engine.save().await.expect("save");
        assert!(!engine.is_dirty().await.expect("dirty"));

        engine.open("doc", "c").await.expect("reopen");
        let state = engine.snapshot().await.expect("snapshot");
        assert_eq!(state.annotations().len(), 1);
        assert_eq!(engine.history_count().await.expect("count"), 0);

        let tree = engine.layout_block(0).await.expect("layout");
        assert_eq!(tree.root.children.len(), 2);
    }

    #[tokio::test]
    async fn pending_range_is_validated_and_not_recorded() {
        let engine = engine();
        engine.open("doc", "c").await.expect("open");
        assert!(engine
            .set_pending_range(Some(Range::new(0, 0, 99)))
            .await
            .is_err());
        engine
            .set_pending_range(Some(Range::new(0, 5, 0)))
            .await
            .expect("reversed range is fine");
        assert_eq!(engine.history_count().await.expect("count"), 0);
        assert_eq!(
            engine.snapshot().await.expect("snapshot").pending_range(),
            Some(Range::new(0, 5, 0))
        );
    }
}
