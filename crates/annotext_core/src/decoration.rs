//! Decoration model: annotations, hints and slots over ranges.

use crate::constants::DEFAULT_ANNOTATION_CONFIDENCE;
use crate::range::Range;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Closed set of decoration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DecorationKind {
    Annotation,
    Hint,
    Slot,
}

impl DecorationKind {
    pub const ALL: [DecorationKind; 3] = [Self::Annotation, Self::Hint, Self::Slot];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::Hint => "hint",
            Self::Slot => "slot",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Annotation => 0,
            Self::Hint => 1,
            Self::Slot => 2,
        }
    }
}

/// Identity of a decoration: its kind plus a per-kind sequence number.
///
/// Sequence numbers are handed out by [`IdGenerator`] and never reused, so
/// ordering ids of one kind orders decorations by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecorationId {
    pub kind: DecorationKind,
    pub seq: u64,
}

impl DecorationId {
    pub fn new(kind: DecorationKind, seq: u64) -> Self {
        Self { kind, seq }
    }
}

impl fmt::Display for DecorationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.seq)
    }
}

impl FromStr for DecorationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, seq) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("malformed decoration id '{s}'"))?;
        let kind = DecorationKind::ALL
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
            .ok_or_else(|| format!("unknown decoration kind '{prefix}'"))?;
        let seq = seq
            .parse::<u64>()
            .map_err(|_| format!("malformed decoration sequence in '{s}'"))?;
        Ok(Self::new(kind, seq))
    }
}

/// Monotonic per-kind id source shared by a session and its task workers.
///
/// Cloning shares the counters. [`IdGenerator::reset`] is called when a
/// collection is opened, followed by [`IdGenerator::observe`] for every
/// loaded id so fresh ids never collide with stored ones.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counters: Arc<[AtomicU64; 3]>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id for `kind`.
    pub fn next(&self, kind: DecorationKind) -> DecorationId {
        let seq = self.counters[kind.index()].fetch_add(1, Ordering::SeqCst) + 1;
        DecorationId::new(kind, seq)
    }

    /// Make sure later allocations for `id.kind` come after `id`.
    pub fn observe(&self, id: DecorationId) {
        self.counters[id.kind.index()].fetch_max(id.seq, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        for counter in self.counters.iter() {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

/// Shared view over every decoration variant.
pub trait Decorated {
    fn id(&self) -> DecorationId;
    fn range(&self) -> Range;
}

/// Committed label over a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: DecorationId,
    pub range: Range,
    pub tag: String,
    pub confidence: f64,
}

impl Annotation {
    pub fn new(id: DecorationId, range: Range, tag: impl Into<String>, confidence: f64) -> Self {
        Self {
            id,
            range,
            tag: tag.into(),
            confidence,
        }
    }

    /// Full-confidence annotation of `range`, the shape a user edit produces.
    pub fn annotate_range(id: DecorationId, tag: impl Into<String>, range: Range) -> Self {
        Self::new(id, range.normalize(), tag, DEFAULT_ANNOTATION_CONFIDENCE)
    }
}

/// What accepting a hint replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HintAccept {
    /// Add the listed annotations.
    AddAnnotations(Vec<Annotation>),
}

impl HintAccept {
    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Self::AddAnnotations(annotations) => annotations,
        }
    }
}

/// Suggested, not yet accepted, annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub id: DecorationId,
    pub range: Range,
    pub hint: String,
    pub accept: HintAccept,
}

/// Unlabeled structural span, e.g. a sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: DecorationId,
    pub range: Range,
    pub slot_type: String,
}

impl Slot {
    pub fn new(id: DecorationId, range: Range, slot_type: impl Into<String>) -> Self {
        Self {
            id,
            range,
            slot_type: slot_type.into(),
        }
    }
}

macro_rules! impl_decorated {
    ($($ty:ty),*) => {
        $(impl Decorated for $ty {
            fn id(&self) -> DecorationId {
                self.id
            }

            fn range(&self) -> Range {
                self.range
            }
        })*
    };
}

impl_decorated!(Annotation, Hint, Slot);

/// Any decoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decoration {
    Annotation(Annotation),
    Hint(Hint),
    Slot(Slot),
}

impl Decoration {
    pub fn kind(&self) -> DecorationKind {
        match self {
            Self::Annotation(_) => DecorationKind::Annotation,
            Self::Hint(_) => DecorationKind::Hint,
            Self::Slot(_) => DecorationKind::Slot,
        }
    }

    /// Short label for display: the tag, hint text or slot type.
    pub fn label(&self) -> &str {
        match self {
            Self::Annotation(a) => &a.tag,
            Self::Hint(h) => &h.hint,
            Self::Slot(s) => &s.slot_type,
        }
    }
}

impl Decorated for Decoration {
    fn id(&self) -> DecorationId {
        match self {
            Self::Annotation(a) => a.id,
            Self::Hint(h) => h.id,
            Self::Slot(s) => s.id,
        }
    }

    fn range(&self) -> Range {
        match self {
            Self::Annotation(a) => a.range,
            Self::Hint(h) => h.range,
            Self::Slot(s) => s.range,
        }
    }
}

impl From<Annotation> for Decoration {
    fn from(value: Annotation) -> Self {
        Self::Annotation(value)
    }
}

impl From<Hint> for Decoration {
    fn from(value: Hint) -> Self {
        Self::Hint(value)
    }
}

impl From<Slot> for Decoration {
    fn from(value: Slot) -> Self {
        Self::Slot(value)
    }
}

/// Id-keyed decoration collection iterated in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationSet<T> {
    items: BTreeMap<DecorationId, T>,
}

impl<T> Default for DecorationSet<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Decorated> DecorationSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`, returning the previous entry under the same id.
    pub fn insert(&mut self, item: T) -> Option<T> {
        self.items.insert(item.id(), item)
    }

    pub fn remove(&mut self, id: &DecorationId) -> Option<T> {
        self.items.remove(id)
    }

    pub fn get(&self, id: &DecorationId) -> Option<&T> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &DecorationId) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, DecorationId, T> {
        self.items.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = DecorationId> + '_ {
        self.items.keys().copied()
    }

    /// Items whose range lies on `block_index`.
    pub fn on_block(&self, block_index: usize) -> impl Iterator<Item = &T> + '_ {
        self.items
            .values()
            .filter(move |item| item.range().block_index == block_index)
    }
}

impl<T: Decorated> FromIterator<T> for DecorationSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|item| (item.id(), item)).collect(),
        }
    }
}

impl<T: Clone> DecorationSet<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}
