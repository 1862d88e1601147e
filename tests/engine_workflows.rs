use annotext::{
    find_parent, ActionCategory, Editor, Engine, EngineConfig, RedbStore, Range, RunOutcome,
    SentenceSegmentation, SimpleMatching, SpanKind, TaskRunState, TaskRuntime,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn engine_at(db_path: &Path) -> Engine {
    let store = RedbStore::open(db_path).expect("open store");
    let config = EngineConfig {
        db_path: db_path.to_string_lossy().to_string(),
        ..EngineConfig::default()
    };
    Engine::new(Arc::new(store), config)
}

async fn setup_engine(blocks: &[&str]) -> (Engine, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let engine = engine_at(&temp_dir.path().join("test.redb"));
    let blocks: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
    engine.store().put_document("doc", &blocks).expect("put document");
    engine.open("doc", "main").await.expect("open");
    (engine, temp_dir)
}

#[tokio::test]
async fn revert_rolls_back_to_last_save() {
    let (engine, _temp) = setup_engine(&["one two three four"]).await;
    let editor = Editor::new(engine.clone());

    editor.annotate_range(Range::new(0, 0, 3), "A").await.expect("edit");
    editor.annotate_range(Range::new(0, 4, 7), "B").await.expect("edit");
    engine.save().await.expect("save");
    let saved = engine.snapshot().await.expect("snapshot");
    editor.annotate_range(Range::new(0, 8, 13), "C").await.expect("edit");
    assert!(engine.is_dirty().await.expect("dirty"));

    let undone = engine.revert_to_last_checkpoint().await.expect("revert");
    assert_eq!(undone.len(), 2);
    assert_eq!(undone[1].category, ActionCategory::SideEffects);
    assert_eq!(engine.history_count().await.expect("count"), 2);
    assert_eq!(
        engine.snapshot().await.expect("snapshot").annotations(),
        saved.annotations()
    );
    assert!(!engine.is_dirty().await.expect("dirty"));

    // No earlier checkpoint: the walk undoes everything that is left.
    let undone = engine.revert_to_last_checkpoint().await.expect("revert");
    assert_eq!(undone.len(), 2);
    assert_eq!(engine.history_count().await.expect("count"), 0);
    assert!(engine
        .revert_to_last_checkpoint()
        .await
        .expect("revert")
        .is_empty());
}

#[tokio::test]
async fn saved_collection_survives_reopen_without_id_reuse() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("test.redb");
    {
        let engine = engine_at(&db_path);
        engine
            .store()
            .put_document("doc", &["cat and dog".to_string()])
            .expect("put");
        engine.open("doc", "main").await.expect("open");
        Editor::new(engine.clone())
            .annotate_range(Range::new(0, 0, 3), "Animal")
            .await
            .expect("annotate");
        engine.save().await.expect("save");
    }

    let engine = engine_at(&db_path);
    engine.open("doc", "main").await.expect("reopen");
    let before: Vec<_> = engine
        .snapshot()
        .await
        .expect("snapshot")
        .annotations()
        .ids()
        .collect();
    assert_eq!(before.len(), 1);
    assert_eq!(engine.history_count().await.expect("count"), 0);

    Editor::new(engine.clone())
        .annotate_range(Range::new(0, 8, 11), "Animal")
        .await
        .expect("annotate");
    let after: Vec<_> = engine
        .snapshot()
        .await
        .expect("snapshot")
        .annotations()
        .ids()
        .collect();
    assert_eq!(after.len(), 2);
    assert!(after.contains(&before[0]));
}

#[tokio::test]
async fn segmentation_then_matching_share_one_undo_stream() {
    let (engine, _temp) = setup_engine(&["A cat.", "a cat sat."]).await;
    let runtime = TaskRuntime::with_defaults(engine.clone());

    let segmentation = runtime
        .add_task(SentenceSegmentation::IMPL_NAME)
        .expect("add segmentation");
    runtime
        .set_options(
            segmentation,
            &annotext::TaskOptions::new().with("cut_list", "."),
        )
        .expect("options");
    assert_eq!(runtime.run(segmentation).expect("run"), RunOutcome::Started);
    runtime.join(segmentation).await.expect("join");
    assert_eq!(
        engine.snapshot().await.expect("snapshot").slots().len(),
        2
    );

    let matching = runtime.add_task(SimpleMatching::IMPL_NAME).expect("add matching");
    let mut notifications = engine.subscribe_notifications();
    runtime.run(matching).expect("run matching");
    Editor::new(engine.clone())
        .annotate_range(Range::new(0, 2, 5), "X")
        .await
        .expect("annotate");
    tokio::time::timeout(Duration::from_secs(5), notifications.recv())
        .await
        .expect("matching in time")
        .expect("notification");

    let state = engine.snapshot().await.expect("snapshot");
    let hints: Vec<Range> = state.hints().iter().map(|hint| hint.range).collect();
    assert_eq!(hints, vec![Range::new(1, 2, 5)]);

    let (summaries, count) = engine.history().await.expect("history");
    assert_eq!(count, 3);
    let categories: Vec<ActionCategory> = summaries.iter().map(|s| s.category).collect();
    assert_eq!(
        categories,
        vec![ActionCategory::Task, ActionCategory::UserEdit, ActionCategory::Task]
    );

    let tree = engine.layout_block(1).await.expect("layout");
    let hint_id = state.hints().ids().next().expect("hint id");
    let parent = find_parent(&tree, hint_id).expect("parent");
    assert!(matches!(parent.kind, SpanKind::Decoration(id) if id.kind == annotext::DecorationKind::Slot));

    engine.undo().await.expect("undo").expect("undone");
    assert!(engine.snapshot().await.expect("snapshot").hints().is_empty());

    runtime.shutdown().await.expect("shutdown");
    assert_eq!(runtime.state(matching).expect("state"), TaskRunState::Idle);
}

#[tokio::test]
async fn stopping_before_first_apply_leaves_history_alone() {
    let (engine, _temp) = setup_engine(&["cat", "a cat sat"]).await;
    let runtime = TaskRuntime::with_defaults(engine.clone());
    let matching = runtime.add_task(SimpleMatching::IMPL_NAME).expect("add");
    runtime.run(matching).expect("run");

    let before = engine.history_count().await.expect("count");
    assert!(runtime.stop(matching).await.expect("stop"));
    assert_eq!(runtime.state(matching).expect("state"), TaskRunState::Idle);
    assert_eq!(engine.history_count().await.expect("count"), before);
}
