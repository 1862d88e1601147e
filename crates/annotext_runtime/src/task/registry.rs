use super::matching::SimpleMatching;
use super::segmentation::SentenceSegmentation;
use super::{TaskOptions, TaskWorker};
use crate::error::TaskError;
use std::collections::BTreeMap;

/// Builds a worker from a task's current options.
pub type TaskBuilder = fn(&TaskOptions) -> Result<Box<dyn TaskWorker>, TaskError>;

/// Registered task implementation.
#[derive(Clone)]
pub struct TaskSpec {
    pub impl_name: &'static str,
    pub default_name: &'static str,
    pub description: &'static str,
    pub default_options: TaskOptions,
    /// At most one task of this implementation may run at a time.
    pub singleton: bool,
    pub build: TaskBuilder,
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("impl_name", &self.impl_name)
            .field("default_options", &self.default_options)
            .field("singleton", &self.singleton)
            .finish_non_exhaustive()
    }
}

/// Task implementations keyed by `impl_name`.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    specs: BTreeMap<&'static str, TaskSpec>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock segmentation and matching tasks.
    pub fn with_defaults(cut_list: &str) -> Self {
        let mut registry = Self::new();
        registry.register(SentenceSegmentation::spec(cut_list));
        registry.register(SimpleMatching::spec());
        registry
    }

    pub fn register(&mut self, spec: TaskSpec) -> Option<TaskSpec> {
        self.specs.insert(spec.impl_name, spec)
    }

    pub fn get(&self, impl_name: &str) -> Option<&TaskSpec> {
        self.specs.get(impl_name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &TaskSpec> {
        self.specs.values()
    }
}
