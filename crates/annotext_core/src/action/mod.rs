//! Reversible editor actions.
//!
//! Every change to [`EditorState`] goes through a [`ReversibleAction`]: the
//! session calls `prepare` once against the current state and history, then
//! `next` to apply it. `prev` undoes it and `next` redoes it. Only `prepare`
//! can fail; it validates everything `next` and `prev` rely on.

mod checkpoint;
mod decorations;
mod selection;


pub use checkpoint::Checkpoint;
pub use decorations::{AcceptHint, AddDecorations, ClearBlockDecorations, RemoveDecorations};
pub use selection::{SetSel, SetSelMethod};

use crate::error::EngineError;
use crate::history::History;
use crate::state::EditorState;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Unwind policy of an action.
///
/// Categories never affect coalescing. Revert walks back until it has undone
/// one [`ActionCategory::SideEffects`] action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    UserEdit,
    Task,
    SideEffects,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UserEdit => "user-edit",
            Self::Task => "task",
            Self::SideEffects => "side-effects",
        };
        f.write_str(label)
    }
}

/// Sequence number assigned by the session when an action is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping shared by every action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMeta {
    pub id: Option<ActionId>,
    pub category: ActionCategory,
}

impl Default for ActionMeta {
    fn default() -> Self {
        Self {
            id: None,
            category: ActionCategory::UserEdit,
        }
    }
}

/// Outcome of [`ReversibleAction::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preparation {
    /// Push as a new history entry.
    Fresh,
    /// Replace the last applied entry; the action adopted its previous snapshot.
    CoalesceWithLast,
}

/// Command object with an inverse.
pub trait ReversibleAction: Any + Send + fmt::Debug {
    fn meta(&self) -> &ActionMeta;

    fn meta_mut(&mut self) -> &mut ActionMeta;

    /// Human-readable description shown in history listings.
    fn message(&self) -> String;

    /// Capture whatever `prev` needs and validate what `next` relies on.
    ///
    /// # Errors
    /// Returns an error when the action cannot apply to `state`; the caller
    /// leaves state and history untouched in that case.
    fn prepare(&mut self, state: &EditorState, history: &History)
        -> Result<Preparation, EngineError>;

    fn next(&self, state: &mut EditorState);

    fn prev(&self, state: &mut EditorState);

    fn as_any(&self) -> &dyn Any;

    fn category(&self) -> ActionCategory {
        self.meta().category
    }

    fn id(&self) -> Option<ActionId> {
        self.meta().id
    }

    fn summary(&self) -> ActionSummary {
        ActionSummary {
            id: self.id(),
            category: self.category(),
            message: self.message(),
        }
    }

    #[must_use]
    fn with_category(mut self, category: ActionCategory) -> Self
    where
        Self: Sized,
    {
        self.meta_mut().category = category;
        self
    }
}

/// Owned description of an applied or undone action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub id: Option<ActionId>,
    pub category: ActionCategory,
    pub message: String,
}

impl fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} [{}] {}", id, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

macro_rules! impl_action_plumbing {
    () => {
        fn meta(&self) -> &$crate::action::ActionMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut $crate::action::ActionMeta {
            &mut self.meta
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }
    };
}

pub(crate) use impl_action_plumbing;
