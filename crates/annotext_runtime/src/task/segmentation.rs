//! Sentence segmentation: one pass that adds `sentence` slots.

use super::registry::TaskSpec;
use super::{TaskContext, TaskOptions, TaskWorker};
use crate::error::TaskError;
use crate::notification::Notification;
use annotext_core::constants::SENTENCE_SLOT_TYPE;
use annotext_core::{
    AddDecorations, Decorated, Decoration, DecorationKind, EngineError, Range, Slot,
};
use async_trait::async_trait;

const CUT_LIST_OPTION: &str = "cut_list";

/// Sentence ranges of `blocks`.
///
/// Each block is cut after every char in `cut_list`; the delimiter belongs to
/// the sentence it ends and text after the last delimiter is dropped.
/// Candidates are trimmed of surrounding whitespace, and empty candidates or
/// ones overlapping a range in `existing` are discarded.
pub fn segment(blocks: &[String], cut_list: &str, existing: &[Range]) -> Vec<Range> {
    let mut sentences = Vec::new();
    for (block_index, block) in blocks.iter().enumerate() {
        let chars: Vec<char> = block.chars().collect();
        let mut start = 0;
        for (offset, ch) in chars.iter().enumerate() {
            if !cut_list.contains(*ch) {
                continue;
            }
            let end = offset + 1;
            let candidate = &chars[start..end];
            start = end;

            let leading = candidate.iter().take_while(|c| c.is_whitespace()).count();
            if leading == candidate.len() {
                continue;
            }
            let trailing = candidate
                .iter()
                .rev()
                .take_while(|c| c.is_whitespace())
                .count();
            let range = Range::new(
                block_index,
                end - candidate.len() + leading,
                end - trailing,
            );
            if existing.iter().any(|other| other.overlaps(&range)) {
                continue;
            }
            sentences.push(range);
        }
    }
    sentences
}

/// Stock task adding a `sentence` slot per delimited sentence.
#[derive(Debug, Clone)]
pub struct SentenceSegmentation {
    cut_list: String,
}

impl SentenceSegmentation {
    pub const IMPL_NAME: &'static str = "SentenceSegmentation";

    pub fn spec(default_cut_list: &str) -> TaskSpec {
        TaskSpec {
            impl_name: Self::IMPL_NAME,
            default_name: "sentence-segmentation",
            description: "Split blocks into sentence slots",
            default_options: TaskOptions::new().with(CUT_LIST_OPTION, default_cut_list),
            singleton: false,
            build: Self::build,
        }
    }

    fn build(options: &TaskOptions) -> Result<Box<dyn TaskWorker>, TaskError> {
        let cut_list = options.get(CUT_LIST_OPTION).unwrap_or_default();
        if cut_list.is_empty() {
            return Err(TaskError::InvalidOption {
                key: CUT_LIST_OPTION.to_string(),
                reason: "at least one delimiter is required".to_string(),
            });
        }
        Ok(Box::new(Self {
            cut_list: cut_list.to_string(),
        }))
    }
}

#[async_trait]
impl TaskWorker for SentenceSegmentation {
    async fn run(self: Box<Self>, ctx: TaskContext) -> Result<(), TaskError> {
        let state = ctx.engine().snapshot().await?;
        if state
            .slots()
            .iter()
            .any(|slot| slot.slot_type == SENTENCE_SLOT_TYPE)
        {
            ctx.notify(Notification::warning("Sentence slots already exist"));
            return Ok(());
        }

        let existing: Vec<Range> = state.gather().values().map(|d| d.range()).collect();
        let ranges = segment(state.blocks(), &self.cut_list, &existing);
        if ranges.is_empty() {
            ctx.notify(Notification::info("No sentences found"));
            return Ok(());
        }

        let ids = ctx.engine().ids();
        let slots: Vec<Decoration> = ranges
            .into_iter()
            .map(|range| Slot::new(ids.next(DecorationKind::Slot), range, SENTENCE_SLOT_TYPE).into())
            .collect();
        // The snapshot may be stale by now; the guards re-check under the session lock.
        let action = AddDecorations::new(slots)
            .exclusive_slot_type(SENTENCE_SLOT_TYPE)
            .skip_overlapping()
            .with_message(format!("{} split sentences on {:?}", ctx.name(), self.cut_list));
        match ctx.apply(action).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(()),
            Err(TaskError::Engine(EngineError::Conflict(reason))) => {
                tracing::info!(task = %ctx.task_id(), %reason, "segmentation skipped");
                ctx.notify(Notification::warning(format!("Segmentation skipped: {}", reason)));
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let count = ctx
            .engine()
            .snapshot()
            .await?
            .slots()
            .iter()
            .filter(|slot| slot.slot_type == SENTENCE_SLOT_TYPE)
            .count();
        tracing::info!(task = %ctx.task_id(), sentences = count, "segmentation finished");
        ctx.notify(Notification::success(format!(
            "Segmentation finished: {} sentence(s)",
            count
        )));
        Ok(())
    }
}
