//! Task table and worker lifecycle.
//!
//! A task is idle or running. `run` spawns a worker subscribed to the
//! interaction bus; completion and `stop` both return the task to idle. Each
//! run carries a generation so a worker finishing after it was stopped (and
//! possibly restarted) never clears the newer run.

use super::registry::TaskRegistry;
use super::{TaskContext, TaskId, TaskOptions};
use crate::engine::Engine;
use crate::error::TaskError;
use crate::notification::Notification;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRunState {
    Idle,
    Running,
}

/// Result of [`TaskRuntime::run`]. Only `Started` spawns a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Started,
    AlreadyRunning,
    /// A singleton implementation is already running under another task.
    SingletonConflict { running: TaskId },
}

/// Listing entry for a configured task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub impl_name: String,
    pub name: String,
    pub options: TaskOptions,
    pub state: TaskRunState,
}

#[derive(Debug)]
struct RunHandle {
    generation: u64,
    cancel: CancellationToken,
    done: CancellationToken,
}

#[derive(Debug)]
struct TaskEntry {
    impl_name: String,
    name: String,
    options: TaskOptions,
    generation: u64,
    run: Option<RunHandle>,
}

impl TaskEntry {
    fn state(&self) -> TaskRunState {
        if self.run.is_some() {
            TaskRunState::Running
        } else {
            TaskRunState::Idle
        }
    }
}

#[derive(Debug, Default)]
struct TaskTable {
    next_id: u64,
    tasks: BTreeMap<TaskId, TaskEntry>,
}

/// Runs registered tasks against one [`Engine`].
pub struct TaskRuntime {
    engine: Engine,
    registry: TaskRegistry,
    table: Arc<Mutex<TaskTable>>,
}

impl std::fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRuntime")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn lock_table(table: &Mutex<TaskTable>) -> Result<MutexGuard<'_, TaskTable>, TaskError> {
    table.lock().map_err(|_| TaskError::Poisoned)
}

impl TaskRuntime {
    pub fn new(engine: Engine, registry: TaskRegistry) -> Self {
        Self {
            engine,
            registry,
            table: Arc::new(Mutex::new(TaskTable::default())),
        }
    }

    /// Runtime with the stock tasks, configured from the engine config.
    pub fn with_defaults(engine: Engine) -> Self {
        let registry = TaskRegistry::with_defaults(&engine.config().cut_list);
        Self::new(engine, registry)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Configure a task of `impl_name` with its default name and options.
    ///
    /// # Errors
    /// Returns [`TaskError::UnknownImpl`] for an unregistered implementation.
    pub fn add_task(&self, impl_name: &str) -> Result<TaskId, TaskError> {
        let spec = self
            .registry
            .get(impl_name)
            .ok_or_else(|| TaskError::UnknownImpl(impl_name.to_string()))?;
        let mut table = lock_table(&self.table)?;
        table.next_id += 1;
        let id = TaskId(table.next_id);
        table.tasks.insert(
            id,
            TaskEntry {
                impl_name: spec.impl_name.to_string(),
                name: spec.default_name.to_string(),
                options: spec.default_options.clone(),
                generation: 0,
                run: None,
            },
        );
        Ok(id)
    }

    /// Stop and forget a task. Returns `false` when the id is unknown.
    ///
    /// # Errors
    /// Returns [`TaskError::Poisoned`] when the task table is unusable.
    pub async fn remove_task(&self, id: TaskId) -> Result<bool, TaskError> {
        if !self.contains(id)? {
            return Ok(false);
        }
        self.stop(id).await?;
        Ok(lock_table(&self.table)?.tasks.remove(&id).is_some())
    }

    fn contains(&self, id: TaskId) -> Result<bool, TaskError> {
        Ok(lock_table(&self.table)?.tasks.contains_key(&id))
    }

    /// Overlay `options` on the task's options. Takes effect on the next run.
    ///
    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id.
    pub fn set_options(&self, id: TaskId, options: &TaskOptions) -> Result<(), TaskError> {
        let mut table = lock_table(&self.table)?;
        let entry = table.tasks.get_mut(&id).ok_or(TaskError::UnknownTask(id))?;
        entry.options.merge(options);
        Ok(())
    }

    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id.
    pub fn rename(&self, id: TaskId, name: impl Into<String>) -> Result<(), TaskError> {
        let mut table = lock_table(&self.table)?;
        let entry = table.tasks.get_mut(&id).ok_or(TaskError::UnknownTask(id))?;
        entry.name = name.into();
        Ok(())
    }

    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id.
    pub fn state(&self, id: TaskId) -> Result<TaskRunState, TaskError> {
        let table = lock_table(&self.table)?;
        table
            .tasks
            .get(&id)
            .map(TaskEntry::state)
            .ok_or(TaskError::UnknownTask(id))
    }

    /// Every configured task in id order.
    ///
    /// # Errors
    /// Returns [`TaskError::Poisoned`] when the task table is unusable.
    pub fn tasks(&self) -> Result<Vec<TaskInfo>, TaskError> {
        let table = lock_table(&self.table)?;
        Ok(table
            .tasks
            .iter()
            .map(|(id, entry)| TaskInfo {
                id: *id,
                impl_name: entry.impl_name.clone(),
                name: entry.name.clone(),
                options: entry.options.clone(),
                state: entry.state(),
            })
            .collect())
    }

    /// Start the task's worker.
    ///
    /// Running an already-running task, or a second instance of a singleton
    /// implementation, is a no-op reported as an info notification.
    ///
    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id, or the
    /// implementation's error when it rejects the task's options.
    pub fn run(&self, id: TaskId) -> Result<RunOutcome, TaskError> {
        let mut table = lock_table(&self.table)?;
        let entry = table.tasks.get(&id).ok_or(TaskError::UnknownTask(id))?;
        let spec = self
            .registry
            .get(&entry.impl_name)
            .ok_or_else(|| TaskError::UnknownImpl(entry.impl_name.clone()))?;

        if entry.run.is_some() {
            self.engine
                .notify(Notification::info(format!("{} is already running", entry.name)));
            return Ok(RunOutcome::AlreadyRunning);
        }
        if spec.singleton {
            let running = table
                .tasks
                .iter()
                .find(|(other, e)| **other != id && e.impl_name == spec.impl_name && e.run.is_some())
                .map(|(other, _)| *other);
            if let Some(running) = running {
                self.engine.notify(Notification::info(format!(
                    "{} is a singleton and already runs as {}",
                    spec.impl_name, running
                )));
                return Ok(RunOutcome::SingletonConflict { running });
            }
        }

        let worker = (spec.build)(&entry.options)?;
        let name = entry.name.clone();
        let Some(entry) = table.tasks.get_mut(&id) else {
            return Err(TaskError::UnknownTask(id));
        };
        entry.generation += 1;
        let generation = entry.generation;
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        entry.run = Some(RunHandle {
            generation,
            cancel: cancel.clone(),
            done: done.clone(),
        });
        drop(table);

        let interactions = self.engine.bus().subscribe();
        let ctx = TaskContext::new(id, name.clone(), self.engine.clone(), interactions, cancel.clone());
        let table = Arc::clone(&self.table);
        let engine = self.engine.clone();
        info!(task = %id, name = %name, "task started");

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Ok(()),
                result = worker.run(ctx) => result,
            };
            match &result {
                Ok(()) if cancel.is_cancelled() => info!(task = %id, "task stopped"),
                Ok(()) => info!(task = %id, "task finished"),
                Err(err) => {
                    warn!(task = %id, "task failed: {}", err);
                    engine.notify(Notification::error(format!("{} failed: {}", name, err)));
                }
            }
            if let Ok(mut table) = table.lock() {
                if let Some(entry) = table.tasks.get_mut(&id) {
                    if entry.run.as_ref().map(|run| run.generation) == Some(generation) {
                        entry.run = None;
                    }
                }
            }
            done.cancel();
        });

        Ok(RunOutcome::Started)
    }

    /// Cancel the task's worker and wait until it has let go.
    ///
    /// Returns `false` when the task was not running. An apply the worker
    /// already started completes; no further apply starts.
    ///
    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id.
    pub async fn stop(&self, id: TaskId) -> Result<bool, TaskError> {
        let run = {
            let mut table = lock_table(&self.table)?;
            let entry = table.tasks.get_mut(&id).ok_or(TaskError::UnknownTask(id))?;
            entry.run.take()
        };
        let Some(run) = run else {
            return Ok(false);
        };
        run.cancel.cancel();
        run.done.cancelled().await;
        Ok(true)
    }

    /// Wait for the task's current run to end without cancelling it.
    ///
    /// # Errors
    /// Returns [`TaskError::UnknownTask`] for an unknown id.
    pub async fn join(&self, id: TaskId) -> Result<(), TaskError> {
        let done = {
            let table = lock_table(&self.table)?;
            let entry = table.tasks.get(&id).ok_or(TaskError::UnknownTask(id))?;
            entry.run.as_ref().map(|run| run.done.clone())
        };
        if let Some(done) = done {
            done.cancelled().await;
        }
        Ok(())
    }

    /// Stop every running task.
    ///
    /// # Errors
    /// Returns [`TaskError::Poisoned`] when the task table is unusable.
    pub async fn shutdown(&self) -> Result<(), TaskError> {
        let ids: Vec<TaskId> = lock_table(&self.table)?.tasks.keys().copied().collect();
        for id in ids {
            self.stop(id).await?;
        }
        Ok(())
    }
}

impl Drop for TaskRuntime {
    fn drop(&mut self) {
        if let Ok(table) = self.table.lock() {
            for entry in table.tasks.values() {
                if let Some(run) = &entry.run {
                    run.cancel.cancel();
                }
            }
        }
    }
}
