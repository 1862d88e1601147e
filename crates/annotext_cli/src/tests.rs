//! Unit tests for the `annotext` CLI entrypoint module.

use super::{execute, render_tree, split_blocks, Cli, Commands, Workspace};
use annotext_core::{DecorationId, DecorationKind, EngineConfig, RedbStore};
use annotext_runtime::Engine;
use clap::Parser;
use std::sync::Arc;
use tempfile::TempDir;

fn workspace(json: bool) -> (Workspace, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("annotext.redb");
    let store = RedbStore::open(&db_path).expect("store");
    let config = EngineConfig {
        db_path: db_path.to_string_lossy().to_string(),
        ..EngineConfig::default()
    };
    let workspace = Workspace {
        engine: Engine::new(Arc::new(store), config),
        collection: "main".to_string(),
        json,
    };
    (workspace, dir)
}

fn import(workspace: &Workspace, doc: &str, blocks: &[&str]) {
    let blocks: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
    workspace
        .engine
        .store()
        .put_document(doc, &blocks)
        .expect("put document");
}

#[test]
fn split_blocks_keeps_one_block_per_line() {
    assert_eq!(split_blocks("a.\nb.\n\nc."), vec!["a.", "b.", "", "c."]);
    assert!(split_blocks("").is_empty());
}

#[test]
fn parses_annotate_with_match_flag() {
    let cli = Cli::try_parse_from([
        "annotext", "annotate", "doc", "-b", "0", "-s", "1", "-e", "4", "-t", "Animal", "--match",
        "-c", "draft",
    ])
    .expect("parse");
    assert_eq!(cli.collection, "draft");
    match cli.command {
        Commands::Annotate {
            block,
            start,
            end,
            tag,
            hint_matches,
            ..
        } => {
            assert_eq!((block, start, end), (0, 1, 4));
            assert_eq!(tag, "Animal");
            assert!(hint_matches);
        }
        _ => panic!("expected annotate"),
    }
}

#[test]
fn parses_decoration_ids() {
    let cli = Cli::try_parse_from(["annotext", "accept", "doc", "hint-3"]).expect("parse");
    match cli.command {
        Commands::Accept { hint, .. } => {
            assert_eq!(hint, DecorationId::new(DecorationKind::Hint, 3));
        }
        _ => panic!("expected accept"),
    }
    assert!(Cli::try_parse_from(["annotext", "accept", "doc", "bogus"]).is_err());
}

#[tokio::test]
async fn segment_then_show_renders_sentence_slots() {
    let (workspace, _dir) = workspace(false);
    import(&workspace, "doc", &["AB。CD！EF"]);

    let out = execute(
        &workspace,
        Commands::Segment {
            doc: "doc".to_string(),
            cut_list: None,
        },
    )
    .await
    .expect("segment");
    assert!(out.iter().any(|line| line == "Saved 2 decoration(s)"));
    assert!(out.iter().any(|line| line.contains("Segmentation finished")));

    let out = execute(
        &workspace,
        Commands::Show {
            doc: "doc".to_string(),
            block: None,
        },
    )
    .await
    .expect("show");
    assert_eq!(out[0], "# block 0");
    assert_eq!(out[1], "block [0,8) \"AB。CD！EF\"");
    assert!(out[2].starts_with("  slot-"));
    assert!(out[2].contains("sentence [0,3)"));
}

#[tokio::test]
async fn annotate_with_matching_saves_hints() {
    let (workspace, _dir) = workspace(false);
    import(&workspace, "doc", &["cat and cat"]);

    let out = execute(
        &workspace,
        Commands::Annotate {
            doc: "doc".to_string(),
            block: 0,
            start: 0,
            end: 3,
            tag: "Animal".to_string(),
            hint_matches: true,
            wait_ms: 5_000,
        },
    )
    .await
    .expect("annotate");
    assert!(out[0].contains("Annotate"));

    let stats = {
        workspace.open("doc").await.expect("reopen");
        workspace.engine.stats().await.expect("stats")
    };
    assert_eq!(stats.annotation_count, 1);
    assert_eq!(stats.hint_count, 1);
}

#[tokio::test]
async fn list_and_delete_collections() {
    let (workspace, _dir) = workspace(true);
    import(&workspace, "doc", &["Hi."]);
    execute(
        &workspace,
        Commands::Segment {
            doc: "doc".to_string(),
            cut_list: Some(".".to_string()),
        },
    )
    .await
    .expect("segment");

    let out = execute(
        &workspace,
        Commands::List {
            doc: "doc".to_string(),
        },
    )
    .await
    .expect("list");
    let listed: Vec<String> = serde_json::from_str(&out[0]).expect("json");
    assert_eq!(listed, vec!["main".to_string()]);

    execute(
        &workspace,
        Commands::Delete {
            doc: "doc".to_string(),
            collection: "main".to_string(),
        },
    )
    .await
    .expect("delete");
    let err = execute(
        &workspace,
        Commands::Delete {
            doc: "doc".to_string(),
            collection: "main".to_string(),
        },
    )
    .await
    .expect_err("already deleted");
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn render_tree_marks_split_pieces() {
    let (workspace, _dir) = workspace(false);
    import(&workspace, "doc", &["abcdefgh"]);
    workspace.open("doc").await.expect("open");
    let editor = annotext_runtime::Editor::new(workspace.engine.clone());
    editor
        .annotate_range(annotext_core::Range::new(0, 0, 5), "A")
        .await
        .expect("first");
    editor
        .annotate_range(annotext_core::Range::new(0, 3, 8), "B")
        .await
        .expect("second");

    let state = workspace.engine.snapshot().await.expect("snapshot");
    let tree = workspace.engine.layout_block(0).await.expect("layout");
    let lines = render_tree(&tree, state.block(0).expect("block"), &state.gather());
    assert_eq!(lines.iter().filter(|line| line.contains("(part)")).count(), 2);
    assert!(lines.iter().any(|line| line.trim_start().starts_with("text [0,3)")));
}

#[tokio::test]
async fn json_flag_reports_edits_as_one_object() {
    let (workspace, _dir) = workspace(true);
    import(&workspace, "doc", &["AB。CD！EF"]);

    let out = execute(
        &workspace,
        Commands::Segment {
            doc: "doc".to_string(),
            cut_list: None,
        },
    )
    .await
    .expect("segment");
    assert_eq!(out.len(), 1);
    let report: serde_json::Value = serde_json::from_str(&out[0]).expect("json");
    assert_eq!(report["saved"], 2);
    assert_eq!(report["actions"][0]["category"], "Task");
    assert_eq!(report["notifications"][0]["level"], "success");

    let out = execute(
        &workspace,
        Commands::Delete {
            doc: "doc".to_string(),
            collection: "main".to_string(),
        },
    )
    .await
    .expect("delete");
    let deleted: serde_json::Value = serde_json::from_str(&out[0]).expect("json");
    assert_eq!(deleted["deleted"], true);
}

#[tokio::test]
async fn annotate_stops_waiting_once_matching_reports() {
    let (workspace, _dir) = workspace(false);
    import(&workspace, "doc", &["cat and dog"]);

    let command = Commands::Annotate {
        doc: "doc".to_string(),
        block: 0,
        start: 0,
        end: 3,
        tag: "Animal".to_string(),
        hint_matches: true,
        wait_ms: 60_000,
    };
    let out = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        execute(&workspace, command),
    )
    .await
    .expect("returned before the wait ran out")
    .expect("annotate");
    assert!(out
        .iter()
        .any(|line| line == "[info] simple-matching: no hints for Animal"));
    assert!(out.iter().any(|line| line == "Saved 1 decoration(s)"));
}
