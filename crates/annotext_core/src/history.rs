//! Bounded undo/redo history of applied actions.

use crate::action::ReversibleAction;
use crate::constants::DEFAULT_HISTORY_LIMIT;
use std::fmt;

/// Ordered action list with a cursor.
///
/// `entries[..count]` are applied, `entries[count..]` form the redo tail.
/// Pushing truncates the redo tail; exceeding `max_entries` drops the oldest
/// applied entries.
pub struct History {
    entries: Vec<Box<dyn ReversibleAction>>,
    count: usize,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("len", &self.entries.len())
            .field("count", &self.count)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl History {
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            count: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Total entries, including the redo tail.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of applied entries.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn can_redo(&self) -> bool {
        self.count < self.entries.len()
    }

    /// Most recently applied entry.
    pub fn last_applied(&self) -> Option<&dyn ReversibleAction> {
        self.count
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(|action| action.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ReversibleAction> + '_ {
        self.entries.iter().map(|action| action.as_ref())
    }

    /// Append an applied action, discarding the redo tail.
    pub fn push(&mut self, action: Box<dyn ReversibleAction>) {
        self.entries.truncate(self.count);
        self.entries.push(action);
        self.count = self.entries.len();
        self.trim();
    }

    /// Replace the last applied entry with `action`, discarding the redo tail.
    ///
    /// Falls back to [`History::push`] when nothing is applied.
    pub fn replace_last(&mut self, action: Box<dyn ReversibleAction>) {
        self.entries.truncate(self.count);
        if self.entries.pop().is_some() {
            self.count -= 1;
        }
        self.push(action);
    }

    /// Move the cursor back one entry and return the action to undo.
    pub(crate) fn step_back(&mut self) -> Option<&dyn ReversibleAction> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        self.entries.get(self.count).map(|action| action.as_ref())
    }

    /// Move the cursor forward one entry and return the action to redo.
    pub(crate) fn step_forward(&mut self) -> Option<&dyn ReversibleAction> {
        let action = self.entries.get(self.count)?;
        self.count += 1;
        Some(action.as_ref())
    }

    fn trim(&mut self) {
        let overflow = self.entries.len().saturating_sub(self.max_entries);
        if overflow == 0 {
            return;
        }
        let removable = overflow.min(self.count);
        self.entries.drain(..removable);
        self.count -= removable;
    }
}
