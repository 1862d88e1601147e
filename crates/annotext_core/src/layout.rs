//! Layout of one block's decorations into a strict span tree.
//!
//! Decorations are swept in `(start asc, end desc)` order with a stack of open
//! spans. A span contained in the innermost open span nests under it. A span
//! crossing the innermost open span's end is split there: the part inside
//! becomes a composition node, and the rest is queued again as a fragment.
//! Gaps are filled with text leaves, so every node's children tile it.

use crate::decoration::{Decorated, Decoration, DecorationId};
use crate::error::EngineError;
use crate::range::Range;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// What a [`SpanNode`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SpanKind {
    /// Whole block; only used for the root.
    Block,
    /// Undecorated text.
    Text,
    /// A decoration laid out in one piece.
    Decoration(DecorationId),
    /// One piece of a decoration split at a crossing boundary.
    Composition(DecorationId),
}

/// Node of a [`SpanTree`]. Offsets are chars within the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanNode {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SpanNode>,
}

impl SpanNode {
    fn text(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Text,
            children: Vec::new(),
        }
    }

    /// Decoration rendered by this node, if any.
    pub fn decoration_id(&self) -> Option<DecorationId> {
        match self.kind {
            SpanKind::Decoration(id) | SpanKind::Composition(id) => Some(id),
            SpanKind::Block | SpanKind::Text => None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Depth-first walk including `self`.
    pub fn walk(&self) -> Vec<&SpanNode> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            out.push(node);
            pending.extend(node.children.iter().rev());
        }
        out
    }
}

/// Laid-out block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanTree {
    pub block_index: usize,
    pub root: SpanNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    start: usize,
    end: Reverse<usize>,
    order: usize,
    id: DecorationId,
    fragment: bool,
}

struct Frame {
    start: usize,
    end: usize,
    kind: SpanKind,
    cursor: usize,
    children: Vec<SpanNode>,
}

impl Frame {
    fn open(start: usize, end: usize, kind: SpanKind) -> Self {
        Self {
            start,
            end,
            kind,
            cursor: start,
            children: Vec::new(),
        }
    }

    fn fill_to(&mut self, offset: usize) {
        if offset > self.cursor {
            self.children.push(SpanNode::text(self.cursor, offset));
            self.cursor = offset;
        }
    }

    fn push_child(&mut self, node: SpanNode) {
        self.fill_to(node.start);
        self.cursor = node.end;
        self.children.push(node);
    }

    fn into_node(mut self) -> SpanNode {
        self.fill_to(self.end);
        SpanNode {
            start: self.start,
            end: self.end,
            kind: self.kind,
            children: self.children,
        }
    }
}

fn top<'a>(root: &'a mut Frame, open: &'a mut [Frame]) -> &'a mut Frame {
    match open.last_mut() {
        Some(frame) => frame,
        None => root,
    }
}

fn close_top(root: &mut Frame, open: &mut Vec<Frame>) {
    if let Some(frame) = open.pop() {
        let node = frame.into_node();
        top(root, open).push_child(node);
    }
}

/// Lay out the decorations of `block_index` over `block_text`.
///
/// Decorations on other blocks and zero-length ranges are ignored.
///
/// # Errors
/// Returns [`EngineError::OutOfBounds`] when a decoration ends past the block.
pub fn layout<'a>(
    block_text: &str,
    block_index: usize,
    decorations: impl IntoIterator<Item = &'a Decoration>,
) -> Result<SpanTree, EngineError> {
    let len = block_text.chars().count();
    let mut ranges: Vec<(DecorationId, Range)> = decorations
        .into_iter()
        .map(|decoration| (decoration.id(), decoration.range().normalize()))
        .filter(|(_, range)| range.block_index == block_index && !range.is_empty())
        .collect();
    if let Some((_, range)) = ranges.iter().find(|(_, range)| range.end_offset > len) {
        return Err(EngineError::OutOfBounds { range: *range, len });
    }
    ranges.sort_by_key(|(id, _)| *id);

    let mut queue: BinaryHeap<Reverse<Pending>> = ranges
        .iter()
        .enumerate()
        .map(|(order, (id, range))| {
            Reverse(Pending {
                start: range.start_offset,
                end: Reverse(range.end_offset),
                order,
                id: *id,
                fragment: false,
            })
        })
        .collect();

    let mut root = Frame::open(0, len, SpanKind::Block);
    let mut open: Vec<Frame> = Vec::new();

    while let Some(Reverse(item)) = queue.pop() {
        let Reverse(end) = item.end;
        while open.last().is_some_and(|frame| frame.end <= item.start) {
            close_top(&mut root, &mut open);
        }

        let parent = top(&mut root, &mut open);
        parent.fill_to(item.start);
        let parent_end = parent.end;

        let kind = if item.fragment || end > parent_end {
            SpanKind::Composition(item.id)
        } else {
            SpanKind::Decoration(item.id)
        };
        if end > parent_end {
            queue.push(Reverse(Pending {
                start: parent_end,
                end: Reverse(end),
                fragment: true,
                ..item
            }));
        }
        open.push(Frame::open(item.start, end.min(parent_end), kind));
    }

    while !open.is_empty() {
        close_top(&mut root, &mut open);
    }

    Ok(SpanTree {
        block_index,
        root: root.into_node(),
    })
}

/// Innermost node whose direct children include a node for `id`.
///
/// Top-level decorations report the block root. For a split decoration this
/// is the parent of its first piece.
pub fn find_parent(tree: &SpanTree, id: DecorationId) -> Option<&SpanNode> {
    fn parent_of(node: &SpanNode, id: DecorationId) -> Option<&SpanNode> {
        for child in &node.children {
            if child.decoration_id() == Some(id) {
                return Some(node);
            }
            if let Some(found) = parent_of(child, id) {
                return Some(found);
            }
        }
        None
    }
    parent_of(&tree.root, id)
}

/// Decoration nodes directly nested under any piece of `id`.
pub fn find_children(tree: &SpanTree, id: DecorationId) -> Vec<&SpanNode> {
    tree.root
        .walk()
        .into_iter()
        .filter(|node| node.decoration_id() == Some(id))
        .flat_map(|node| node.children.iter())
        .filter(|child| child.decoration_id().is_some())
        .collect()
}
