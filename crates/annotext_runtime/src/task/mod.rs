//! Pluggable assistance tasks run as cancellable workers.

mod matching;
mod registry;
mod runtime;
mod segmentation;

pub use matching::{find_matches, SimpleMatching};
pub use registry::{TaskRegistry, TaskSpec};
pub use runtime::{RunOutcome, TaskInfo, TaskRunState, TaskRuntime};
pub use segmentation::{segment, SentenceSegmentation};

use crate::engine::Engine;
use crate::error::TaskError;
use crate::interaction::Interaction;
use crate::notification::Notification;
use annotext_core::{ActionCategory, ActionSummary, ReversibleAction};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Identity of a configured task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// String options of a task, keyed by option name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TaskOptions(BTreeMap<String, String>);

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(&mut self, other: &TaskOptions) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Body of a running task.
///
/// Workers apply actions through [`TaskContext::apply`] and should return
/// once [`TaskContext::next_interaction`] yields `None`.
#[async_trait]
pub trait TaskWorker: Send {
    async fn run(self: Box<Self>, ctx: TaskContext) -> Result<(), TaskError>;
}

/// Everything a worker may touch while it runs.
pub struct TaskContext {
    task_id: TaskId,
    name: String,
    engine: Engine,
    interactions: broadcast::Receiver<Interaction>,
    cancel: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(
        task_id: TaskId,
        name: String,
        engine: Engine,
        interactions: broadcast::Receiver<Interaction>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task_id,
            name,
            engine,
            interactions,
            cancel,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next broadcast interaction, or `None` once the task is cancelled or
    /// the bus is gone.
    pub async fn next_interaction(&mut self) -> Option<Interaction> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.interactions.recv() => match received {
                    Ok(interaction) => return Some(interaction),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            task = %self.task_id,
                            skipped,
                            "task fell behind the interaction stream"
                        );
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }

    /// Apply `action` as a task action unless the task has been stopped.
    ///
    /// # Errors
    /// Returns the engine error when the action cannot be applied.
    pub async fn apply<A: ReversibleAction>(
        &self,
        action: A,
    ) -> Result<Option<ActionSummary>, TaskError> {
        let action = action.with_category(ActionCategory::Task);
        Ok(self
            .engine
            .apply_unless_cancelled(Box::new(action), &self.cancel)
            .await?)
    }

    pub fn notify(&self, notification: Notification) {
        self.engine.notify(notification);
    }
}
