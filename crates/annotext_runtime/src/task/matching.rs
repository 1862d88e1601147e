//! Simple matching: propose the last annotated tag wherever the same text recurs.

use super::registry::TaskSpec;
use super::{TaskContext, TaskOptions, TaskWorker};
use crate::error::TaskError;
use crate::interaction::Interaction;
use crate::notification::Notification;
use annotext_core::{
    AddDecorations, Annotation, Decorated, Decoration, DecorationKind, Hint, HintAccept, Range,
};
use async_trait::async_trait;
use std::collections::HashSet;

/// Non-overlapping occurrences of `needle` in every block, in char offsets.
pub fn find_matches(blocks: &[String], needle: &str) -> Vec<Range> {
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_chars = needle.chars().count();
    let mut matches = Vec::new();
    for (block_index, block) in blocks.iter().enumerate() {
        let mut chars_before = 0;
        let mut scanned_bytes = 0;
        for (byte_index, _) in block.match_indices(needle) {
            chars_before += block[scanned_bytes..byte_index].chars().count();
            scanned_bytes = byte_index;
            matches.push(Range::new(
                block_index,
                chars_before,
                chars_before + needle_chars,
            ));
        }
    }
    matches
}

/// Stock reactive task answering annotations with hints.
#[derive(Debug, Clone, Default)]
pub struct SimpleMatching;

impl SimpleMatching {
    pub const IMPL_NAME: &'static str = "SimpleMatching";

    pub fn spec() -> TaskSpec {
        TaskSpec {
            impl_name: Self::IMPL_NAME,
            default_name: "simple-matching",
            description: "Hint the same tag wherever annotated text recurs",
            default_options: TaskOptions::new(),
            singleton: true,
            build: Self::build,
        }
    }

    fn build(_options: &TaskOptions) -> Result<Box<dyn TaskWorker>, TaskError> {
        Ok(Box::new(Self))
    }

    async fn on_annotate(
        &self,
        ctx: &TaskContext,
        range: Range,
        tag: &str,
    ) -> Result<usize, TaskError> {
        let state = ctx.engine().snapshot().await?;
        let trigger = range.normalize();
        let text = state.text_of(&trigger)?;
        let gathered = state.gather();
        let existing: HashSet<Range> = gathered.values().map(|d| d.range().normalize()).collect();

        let ids = ctx.engine().ids();
        let hints: Vec<Decoration> = find_matches(state.blocks(), &text)
            .into_iter()
            .filter(|found| *found != trigger && !existing.contains(found))
            .map(|found| {
                let accept = Annotation::annotate_range(ids.next(DecorationKind::Annotation), tag, found);
                Hint {
                    id: ids.next(DecorationKind::Hint),
                    range: found,
                    hint: format!("Apply {}", tag),
                    accept: HintAccept::AddAnnotations(vec![accept]),
                }
                .into()
            })
            .collect();
        if hints.is_empty() {
            return Ok(0);
        }

        let count = hints.len();
        let action = AddDecorations::new(hints)
            .with_message(format!("{}: {} hint(s) for {:?}", ctx.name(), count, text));
        Ok(match ctx.apply(action).await? {
            Some(_) => count,
            None => 0,
        })
    }
}

#[async_trait]
impl TaskWorker for SimpleMatching {
    async fn run(self: Box<Self>, mut ctx: TaskContext) -> Result<(), TaskError> {
        while let Some(interaction) = ctx.next_interaction().await {
            let Interaction::UserAnnotateText { range, tag } = interaction else {
                continue;
            };
            match self.on_annotate(&ctx, range, &tag).await {
                Ok(_) if ctx.is_cancelled() => {}
                Ok(0) => {
                    ctx.notify(Notification::info(format!("{}: no hints for {}", ctx.name(), tag)));
                }
                Ok(count) => {
                    tracing::debug!(task = %ctx.task_id(), hints = count, "matching emitted hints");
                    ctx.notify(Notification::success(format!(
                        "{}: {} hint(s) for {}",
                        ctx.name(),
                        count,
                        tag
                    )));
                }
                Err(err) => {
                    tracing::warn!(task = %ctx.task_id(), "matching failed: {}", err);
                    ctx.notify(Notification::warning(format!("{}: {}", ctx.name(), err)));
                }
            }
        }
        Ok(())
    }
}
