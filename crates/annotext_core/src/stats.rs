//! Per-document decoration statistics.

use crate::decoration::Decorated;
use crate::state::EditorState;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and coverage for an [`EditorState`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocStats {
    pub block_count: usize,
    pub total_chars: usize,
    pub annotation_count: usize,
    pub hint_count: usize,
    pub slot_count: usize,
    /// Annotation count per tag.
    pub tag_counts: BTreeMap<String, usize>,
    /// Characters covered by at least one annotation.
    pub annotated_chars: usize,
}

impl DocStats {
    pub fn compute(state: &EditorState) -> Self {
        let mut tag_counts = BTreeMap::new();
        for annotation in state.annotations().iter() {
            *tag_counts.entry(annotation.tag.clone()).or_insert(0) += 1;
        }

        let mut annotated_chars = 0;
        for block_index in 0..state.blocks().len() {
            let mut spans: Vec<(usize, usize)> = state
                .annotations()
                .on_block(block_index)
                .map(|a| {
                    let range = a.range().normalize();
                    (range.start_offset, range.end_offset)
                })
                .collect();
            spans.sort_unstable();
            let mut covered_to = 0;
            for (start, end) in spans {
                let start = start.max(covered_to);
                if end > start {
                    annotated_chars += end - start;
                    covered_to = end;
                }
            }
        }

        Self {
            block_count: state.blocks().len(),
            total_chars: state.blocks().iter().map(|b| b.chars().count()).sum(),
            annotation_count: state.annotations().len(),
            hint_count: state.hints().len(),
            slot_count: state.slots().len(),
            tag_counts,
            annotated_chars,
        }
    }

    /// Share of characters covered by annotations, in `0.0..=1.0`.
    pub fn coverage(&self) -> f64 {
        if self.total_chars == 0 {
            0.0
        } else {
            self.annotated_chars as f64 / self.total_chars as f64
        }
    }
}
