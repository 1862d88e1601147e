//! Command-line front end for annotext documents and collections.

use anyhow::{bail, Context};
use annotext_core::{
    ActionSummary, Decoration, DecorationId, DocStats, EngineConfig, Range, RedbStore,
    SetSelMethod, SpanKind, SpanNode, SpanTree,
};
use annotext_runtime::{
    Editor, Engine, Notification, RunOutcome, SentenceSegmentation, SimpleMatching, TaskOptions,
    TaskRuntime,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "annotext", about = "Annotate text documents", version)]
struct Cli {
    /// Database file (can also be set via ANNOTEXT_DB_PATH env var)
    #[arg(long, env = "ANNOTEXT_DB_PATH")]
    db: Option<String>,

    /// Collection to operate on
    #[arg(short, long, global = true, default_value = "main")]
    collection: String,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a document; one block per line
    Import {
        doc: String,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Split the document into sentence slots
    Segment {
        doc: String,
        #[arg(long)]
        cut_list: Option<String>,
    },
    /// Annotate a char range of one block
    Annotate {
        doc: String,
        #[arg(short, long)]
        block: usize,
        #[arg(short, long)]
        start: usize,
        #[arg(short, long)]
        end: usize,
        #[arg(short, long)]
        tag: String,
        /// Hint the same tag wherever the annotated text recurs
        #[arg(long = "match")]
        hint_matches: bool,
        /// How long to wait for matching hints
        #[arg(long, default_value = "1000")]
        wait_ms: u64,
    },
    /// Turn a hint into its annotations
    Accept {
        doc: String,
        hint: DecorationId,
    },
    /// Remove decorations by id
    Remove {
        doc: String,
        #[arg(required = true)]
        ids: Vec<DecorationId>,
    },
    /// Print the layout of every block
    Show {
        doc: String,
        #[arg(short, long)]
        block: Option<usize>,
    },
    Stats {
        doc: String,
    },
    /// List the saved collections of a document
    List {
        doc: String,
    },
    Delete {
        doc: String,
        collection: String,
    },
}

/// Store-backed engine for one invocation.
struct Workspace {
    engine: Engine,
    collection: String,
    json: bool,
}

impl Workspace {
    fn open_store(db: Option<String>, collection: String, json: bool) -> anyhow::Result<Self> {
        let mut config = EngineConfig::from_env();
        if let Some(db) = db {
            config.db_path = db;
        }
        let store = RedbStore::open(&config.db_path)
            .with_context(|| format!("opening database at {}", config.db_path))?;
        Ok(Self {
            engine: Engine::new(Arc::new(store), config),
            collection,
            json,
        })
    }

    async fn open(&self, doc: &str) -> anyhow::Result<()> {
        self.engine
            .open(doc, &self.collection)
            .await
            .with_context(|| format!("opening {}/{}", doc, self.collection))
    }
}

/// Split imported text into blocks, one per line.
fn split_blocks(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn span_label(node: &SpanNode, decorations: &BTreeMap<DecorationId, Decoration>) -> String {
    match node.kind {
        SpanKind::Block => "block".to_string(),
        SpanKind::Text => "text".to_string(),
        SpanKind::Decoration(id) | SpanKind::Composition(id) => {
            let label = decorations.get(&id).map(Decoration::label).unwrap_or("?");
            let piece = if matches!(node.kind, SpanKind::Composition(_)) {
                " (part)"
            } else {
                ""
            };
            format!("{} {}{}", id, label, piece)
        }
    }
}

fn render_node(
    node: &SpanNode,
    chars: &[char],
    decorations: &BTreeMap<DecorationId, Decoration>,
    depth: usize,
    out: &mut Vec<String>,
) {
    let text: String = chars[node.start..node.end].iter().collect();
    out.push(format!(
        "{}{} [{},{}) {:?}",
        "  ".repeat(depth),
        span_label(node, decorations),
        node.start,
        node.end,
        text
    ));
    for child in &node.children {
        render_node(child, chars, decorations, depth + 1, out);
    }
}

/// Indented text rendering of a laid-out block.
fn render_tree(
    tree: &SpanTree,
    block: &str,
    decorations: &BTreeMap<DecorationId, Decoration>,
) -> Vec<String> {
    let chars: Vec<char> = block.chars().collect();
    let mut out = vec![format!("# block {}", tree.block_index)];
    render_node(&tree.root, &chars, decorations, 0, &mut out);
    out
}

fn format_stats(stats: &DocStats) -> Vec<String> {
    let mut out = vec![
        format!("blocks:      {}", stats.block_count),
        format!("chars:       {}", stats.total_chars),
        format!("annotations: {}", stats.annotation_count),
        format!("hints:       {}", stats.hint_count),
        format!("slots:       {}", stats.slot_count),
        format!(
            "coverage:    {:.1}% ({} chars)",
            stats.coverage() * 100.0,
            stats.annotated_chars
        ),
    ];
    for (tag, count) in &stats.tag_counts {
        out.push(format!("  {:<20} {}", tag, count));
    }
    out
}

fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// Actions an editing command applied and what followed them.
#[derive(Debug, Default)]
struct EditReport {
    actions: Vec<ActionSummary>,
    /// Decorations written by the save, `None` when nothing changed.
    saved: Option<usize>,
    notifications: Vec<Notification>,
}

impl EditReport {
    fn to_json(&self) -> Value {
        json!({
            "actions": self.actions,
            "saved": self.saved,
            "notifications": self.notifications,
        })
    }

    fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        out.push(match self.saved {
            Some(count) => format!("Saved {} decoration(s)", count),
            None => "Nothing to save".to_string(),
        });
        out.extend(self.notifications.iter().map(ToString::to_string));
        out
    }
}

enum Output {
    Lines(Vec<String>),
    Json(Value),
    Edit(EditReport),
}

/// Wait until the task named `name` reports through a notification.
async fn wait_for_report(rx: &mut broadcast::Receiver<Notification>, name: &str) {
    let prefix = format!("{}:", name);
    loop {
        match rx.recv().await {
            Ok(notification) if notification.message.starts_with(&prefix) => return,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return,
        }
    }
}

/// Run one command and return the lines to print.
async fn execute(workspace: &Workspace, command: Commands) -> anyhow::Result<Vec<String>> {
    let engine = &workspace.engine;
    let json = workspace.json;
    let mut notifications = engine.subscribe_notifications();

    let output = match command {
        Commands::Import { doc, file } => {
            let text = if let Some(path) = file {
                std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?
            } else {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            };
            let blocks = split_blocks(&text);
            engine.store().put_document(&doc, &blocks)?;
            if json {
                Output::Json(json!({ "doc": doc, "blocks": blocks.len() }))
            } else {
                Output::Lines(vec![format!("Imported {} ({} blocks)", doc, blocks.len())])
            }
        }
        Commands::Segment { doc, cut_list } => {
            workspace.open(&doc).await?;
            let runtime = TaskRuntime::with_defaults(engine.clone());
            let task = runtime.add_task(SentenceSegmentation::IMPL_NAME)?;
            if let Some(cut_list) = cut_list {
                runtime.set_options(task, &TaskOptions::new().with("cut_list", cut_list))?;
            }
            runtime.run(task)?;
            runtime.join(task).await?;
            Output::Edit(edit_report(engine).await?)
        }
        Commands::Annotate {
            doc,
            block,
            start,
            end,
            tag,
            hint_matches,
            wait_ms,
        } => {
            workspace.open(&doc).await?;
            let runtime = TaskRuntime::with_defaults(engine.clone());
            let mut matcher = None;
            if hint_matches {
                let task = runtime.add_task(SimpleMatching::IMPL_NAME)?;
                if runtime.run(task)? != RunOutcome::Started {
                    bail!("matching task did not start");
                }
                matcher = runtime
                    .tasks()?
                    .into_iter()
                    .find(|info| info.id == task)
                    .map(|info| info.name);
            }
            let mut reports = engine.subscribe_notifications();
            Editor::new(engine.clone())
                .annotate_range(Range::new(block, start, end), &tag)
                .await?;
            if let Some(name) = matcher {
                let wait = Duration::from_millis(wait_ms);
                if tokio::time::timeout(wait, wait_for_report(&mut reports, &name))
                    .await
                    .is_err()
                {
                    tracing::warn!(task = %name, wait_ms, "no report from matching task");
                }
            }
            runtime.shutdown().await?;
            Output::Edit(edit_report(engine).await?)
        }
        Commands::Accept { doc, hint } => {
            workspace.open(&doc).await?;
            Editor::new(engine.clone()).accept_hint(hint).await?;
            Output::Edit(edit_report(engine).await?)
        }
        Commands::Remove { doc, ids } => {
            workspace.open(&doc).await?;
            let editor = Editor::new(engine.clone());
            editor
                .change_selection(ids, SetSelMethod::Select)
                .await?;
            editor.clear_selected().await?;
            Output::Edit(edit_report(engine).await?)
        }
        Commands::Show { doc, block } => {
            workspace.open(&doc).await?;
            let state = engine.snapshot().await?;
            let indices: Vec<usize> = match block {
                Some(index) => vec![index],
                None => (0..state.blocks().len()).collect(),
            };
            let mut trees = Vec::with_capacity(indices.len());
            for index in indices {
                trees.push(engine.layout_block(index).await?);
            }
            if json {
                Output::Json(serde_json::to_value(&trees)?)
            } else {
                let decorations = state.gather();
                let mut out = Vec::new();
                for tree in &trees {
                    out.extend(render_tree(tree, state.block(tree.block_index)?, &decorations));
                }
                Output::Lines(out)
            }
        }
        Commands::Stats { doc } => {
            workspace.open(&doc).await?;
            let stats = engine.stats().await?;
            if json {
                Output::Json(serde_json::to_value(&stats)?)
            } else {
                Output::Lines(format_stats(&stats))
            }
        }
        Commands::List { doc } => {
            let collections = engine.store().list_collections(&doc)?;
            if json {
                Output::Json(json!(collections))
            } else {
                Output::Lines(collections)
            }
        }
        Commands::Delete { doc, collection } => {
            if !engine.store().delete_collection(&doc, &collection)? {
                bail!("collection {}/{} not found", doc, collection);
            }
            if json {
                Output::Json(json!({ "doc": doc, "collection": collection, "deleted": true }))
            } else {
                Output::Lines(vec![format!("Deleted collection: {}/{}", doc, collection)])
            }
        }
    };

    let raised = drain_notifications(&mut notifications);
    Ok(match output {
        Output::Lines(mut lines) => {
            lines.extend(raised.iter().map(ToString::to_string));
            lines
        }
        Output::Json(value) => vec![serde_json::to_string_pretty(&value)?],
        Output::Edit(mut report) => {
            report.notifications = raised;
            if json {
                vec![serde_json::to_string_pretty(&report.to_json())?]
            } else {
                report.lines()
            }
        }
    })
}

/// Report the actions applied since the collection was opened, then save.
async fn edit_report(engine: &Engine) -> anyhow::Result<EditReport> {
    let (mut actions, applied) = engine.history().await?;
    actions.truncate(applied);
    Ok(EditReport {
        actions,
        saved: save_if_dirty(engine).await?,
        notifications: Vec::new(),
    })
}

async fn save_if_dirty(engine: &Engine) -> anyhow::Result<Option<usize>> {
    if !engine.is_dirty().await? {
        return Ok(None);
    }
    let decorations = engine.gather().await?.len();
    engine.save().await?;
    Ok(Some(decorations))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "annotext=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Cli {
        db,
        collection,
        json,
        command,
    } = Cli::parse();

    let workspace = Workspace::open_store(db, collection, json)?;
    for line in execute(&workspace, command).await? {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
